use crate::core::compiler::PdfLatexCompiler;
use crate::core::rasterizer::GhostscriptRasterizer;
use crate::domain::model::{Artifact, Dpi, ExportOutcome, Snippet};
use crate::domain::ports::{ConfigProvider, Rasterizer, TexCompiler};
use crate::utils::error::{ExportError, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportRequest {
    Pdf(Snippet),
    /// Rasterizes a PDF this exporter already produced.
    Convert(Artifact, Dpi),
}

#[derive(Clone)]
pub struct Exporter {
    compiler: Arc<dyn TexCompiler>,
    rasterizer: Arc<dyn Rasterizer>,
}

impl Exporter {
    pub fn new(compiler: Arc<dyn TexCompiler>, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            compiler,
            rasterizer,
        }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::new(
            Arc::new(PdfLatexCompiler::from_config(config)),
            Arc::new(GhostscriptRasterizer::from_config(config)),
        )
    }

    pub async fn generate_pdf(&self, snippet: &Snippet) -> Result<ExportOutcome> {
        tracing::info!("🔧 Compiling {} snippet", snippet.mode());
        let pdf = self.compiler.generate_pdf(snippet).await?;
        Ok(ExportOutcome { pdf, png: None })
    }

    pub async fn generate_png(&self, snippet: &Snippet, dpi: Dpi) -> Result<ExportOutcome> {
        let ExportOutcome { pdf, .. } = self.generate_pdf(snippet).await?;
        self.convert(pdf, dpi).await
    }

    /// Second half of a PNG export. On failure the PDF stays where it is.
    pub async fn convert(&self, pdf: Artifact, dpi: Dpi) -> Result<ExportOutcome> {
        let png = self.rasterizer.pdf_to_png(&pdf.path, dpi).await?;
        Ok(ExportOutcome {
            pdf,
            png: Some(png),
        })
    }

    pub async fn rasterize(&self, pdf_path: &Path, dpi: Dpi) -> Result<Artifact> {
        if !tokio::fs::try_exists(pdf_path).await.unwrap_or(false) {
            return Err(ExportError::NothingToOpenError {
                path: pdf_path.to_path_buf(),
            });
        }
        self.rasterizer.pdf_to_png(pdf_path, dpi).await
    }

    pub async fn execute(&self, request: ExportRequest) -> Result<ExportOutcome> {
        match request {
            ExportRequest::Pdf(snippet) => self.generate_pdf(&snippet).await,
            ExportRequest::Convert(pdf, dpi) => self.convert(pdf, dpi).await,
        }
    }

    /// Runs `request` on a background task so the caller's loop keeps
    /// servicing input while the external tools work.
    pub fn spawn(&self, request: ExportRequest) -> ExportJob {
        let exporter = self.clone();
        let handle = tokio::spawn(async move { exporter.execute(request).await });
        ExportJob { handle }
    }
}

pub struct ExportJob {
    handle: JoinHandle<Result<ExportOutcome>>,
}

impl ExportJob {
    pub async fn join(&mut self) -> Result<ExportOutcome> {
        (&mut self.handle)
            .await
            .map_err(|e| ExportError::IoError(std::io::Error::other(e)))?
    }

    pub async fn wait(mut self) -> Result<ExportOutcome> {
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ArtifactKind, MathMode};
    use std::path::PathBuf;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeCompiler {
        fail: bool,
    }

    #[async_trait]
    impl TexCompiler for FakeCompiler {
        async fn generate_pdf(&self, snippet: &Snippet) -> Result<Artifact> {
            if self.fail {
                return Err(ExportError::CompileError {
                    detail: format!("! Undefined control sequence in {}", snippet.code()),
                    tex_errors: vec!["! Undefined control sequence".to_string()],
                });
            }
            Ok(Artifact::new(ArtifactKind::Pdf, PathBuf::from("/out/eq.pdf")))
        }
    }

    #[derive(Default)]
    struct RecordingRasterizer {
        calls: Mutex<Vec<(PathBuf, u32)>>,
    }

    #[async_trait]
    impl Rasterizer for RecordingRasterizer {
        async fn pdf_to_png(&self, pdf_path: &Path, dpi: Dpi) -> Result<Artifact> {
            self.calls
                .lock()
                .unwrap()
                .push((pdf_path.to_path_buf(), dpi.value()));
            Ok(Artifact::new(ArtifactKind::Png, pdf_path.with_extension("png")))
        }
    }

    fn snippet() -> Snippet {
        Snippet::new("\\frac{a}{b}", MathMode::Display).unwrap()
    }

    #[tokio::test]
    async fn test_png_rasterizes_compiled_pdf() {
        let rasterizer = Arc::new(RecordingRasterizer::default());
        let exporter = Exporter::new(Arc::new(FakeCompiler { fail: false }), rasterizer.clone());

        let outcome = exporter
            .generate_png(&snippet(), Dpi::new(300).unwrap())
            .await
            .unwrap();

        assert_eq!(outcome.pdf.path, PathBuf::from("/out/eq.pdf"));
        assert_eq!(outcome.primary().path, PathBuf::from("/out/eq.png"));
        assert_eq!(
            *rasterizer.calls.lock().unwrap(),
            vec![(PathBuf::from("/out/eq.pdf"), 300)]
        );
    }

    #[tokio::test]
    async fn test_compile_failure_skips_rasterizer() {
        let rasterizer = Arc::new(RecordingRasterizer::default());
        let exporter = Exporter::new(Arc::new(FakeCompiler { fail: true }), rasterizer.clone());

        let err = exporter
            .generate_png(&snippet(), Dpi::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::CompileError { .. }));
        assert!(rasterizer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_job_reports_outcome() {
        let exporter = Exporter::new(
            Arc::new(FakeCompiler { fail: false }),
            Arc::new(RecordingRasterizer::default()),
        );
        let job = exporter.spawn(ExportRequest::Pdf(snippet()));
        let outcome = job.wait().await.unwrap();
        assert!(outcome.png.is_none());
        assert_eq!(outcome.pdf.kind, ArtifactKind::Pdf);
    }

    #[tokio::test]
    async fn test_convert_request_keeps_pdf_artifact() {
        let rasterizer = Arc::new(RecordingRasterizer::default());
        let exporter = Exporter::new(Arc::new(FakeCompiler { fail: false }), rasterizer.clone());
        let pdf = Artifact::new(ArtifactKind::Pdf, PathBuf::from("/out/eq.pdf"));

        let outcome = exporter
            .spawn(ExportRequest::Convert(pdf.clone(), Dpi::new(600).unwrap()))
            .wait()
            .await
            .unwrap();

        assert_eq!(outcome.pdf, pdf);
        assert_eq!(outcome.primary().kind, ArtifactKind::Png);
        assert_eq!(
            *rasterizer.calls.lock().unwrap(),
            vec![(PathBuf::from("/out/eq.pdf"), 600)]
        );
    }

    #[tokio::test]
    async fn test_rasterize_missing_pdf() {
        let exporter = Exporter::new(
            Arc::new(FakeCompiler { fail: false }),
            Arc::new(RecordingRasterizer::default()),
        );
        let err = exporter
            .rasterize(Path::new("/definitely/missing.pdf"), Dpi::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NothingToOpenError { .. }));
    }
}
