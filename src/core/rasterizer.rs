use crate::core::runner::ToolRunner;
use crate::domain::model::{Artifact, ArtifactKind, Dpi};
use crate::domain::ports::{ConfigProvider, Rasterizer};
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Converts PDFs to transparent PNGs with Ghostscript's `pngalpha` device.
pub struct GhostscriptRasterizer {
    runner: ToolRunner,
}

impl GhostscriptRasterizer {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::new(ToolRunner::new(
            "ghostscript",
            config.ghostscript(),
            config.timeout(),
        ))
    }
}

pub fn png_path_for(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension("png")
}

pub fn ghostscript_args(pdf_path: &Path, png_path: &Path, dpi: Dpi) -> Vec<OsString> {
    let mut output_file = OsString::from("-sOutputFile=");
    output_file.push(png_path.as_os_str());
    vec![
        "-dSAFER".into(),
        "-dBATCH".into(),
        "-dNOPAUSE".into(),
        "-sDEVICE=pngalpha".into(),
        format!("-r{}", dpi).into(),
        output_file,
        pdf_path.as_os_str().to_owned(),
    ]
}

#[async_trait]
impl Rasterizer for GhostscriptRasterizer {
    async fn pdf_to_png(&self, pdf_path: &Path, dpi: Dpi) -> Result<Artifact> {
        self.runner.resolve()?;

        let png_path = png_path_for(pdf_path);
        tracing::debug!("Rasterizing {} at {} dpi", pdf_path.display(), dpi);

        // Success is judged by the PNG existing afterwards.
        match tokio::fs::remove_file(&png_path).await {
            Ok(()) => tracing::debug!("Removed stale {}", png_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let output = self
            .runner
            .run(ghostscript_args(pdf_path, &png_path, dpi), None)
            .await?;

        if tokio::fs::try_exists(&png_path).await.unwrap_or(false) {
            tracing::info!("🖼️ PNG written to {}", png_path.display());
            Ok(Artifact::new(ArtifactKind::Png, png_path))
        } else {
            Err(ExportError::RasterizeError {
                output: output.combined(),
            })
        }
    }
}
