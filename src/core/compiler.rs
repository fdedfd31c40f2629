use crate::core::document::build_document;
use crate::core::output::{move_file, timestamped_path};
use crate::core::runner::ToolRunner;
use crate::domain::model::{Artifact, ArtifactKind, Snippet};
use crate::domain::ports::{ConfigProvider, TexCompiler};
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const JOB_NAME: &str = "document";
pub const LOG_TAIL_LINES: usize = 30;

static TEX_ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^!.*$").expect("static regex"));

/// Compiles snippets with pdflatex inside a throwaway directory and moves
/// the resulting PDF into the output directory.
pub struct PdfLatexCompiler {
    runner: ToolRunner,
    output_dir: PathBuf,
    extra_packages: Vec<String>,
    scratch_root: Option<PathBuf>,
}

impl PdfLatexCompiler {
    pub fn new(runner: ToolRunner, output_dir: PathBuf, extra_packages: Vec<String>) -> Self {
        Self {
            runner,
            output_dir,
            extra_packages,
            scratch_root: None,
        }
    }

    /// Creates the per-compile `latex_*` directories under `root` instead
    /// of the system temp directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::new(
            ToolRunner::new("pdflatex", config.pdflatex(), config.timeout()),
            config.output_dir().to_path_buf(),
            config.extra_packages().to_vec(),
        )
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn compile_in(&self, work_dir: &Path, snippet: &Snippet) -> Result<Artifact> {
        let tex_file = work_dir.join(format!("{}.tex", JOB_NAME));
        tokio::fs::write(&tex_file, build_document(snippet, &self.extra_packages)).await?;

        let args: [OsString; 6] = [
            "-interaction=nonstopmode".into(),
            "-output-directory".into(),
            work_dir.as_os_str().to_owned(),
            "-job-name".into(),
            JOB_NAME.into(),
            tex_file.as_os_str().to_owned(),
        ];
        let output = self.runner.run(args, Some(work_dir)).await?;

        let temp_pdf = work_dir.join(format!("{}.pdf", JOB_NAME));
        if tokio::fs::try_exists(&temp_pdf).await.unwrap_or(false) {
            if !output.success {
                tracing::warn!(
                    "pdflatex exited with {:?} but produced a PDF; keeping it",
                    output.exit_code
                );
            }
            tokio::fs::create_dir_all(&self.output_dir).await?;
            let target = timestamped_path(&self.output_dir, "pdf");
            move_file(&temp_pdf, &target).await?;
            tracing::info!("📄 PDF written to {}", target.display());
            return Ok(Artifact::new(ArtifactKind::Pdf, target));
        }

        let log_file = work_dir.join(format!("{}.log", JOB_NAME));
        let detail = match tokio::fs::read(&log_file).await {
            Ok(bytes) => {
                let log = String::from_utf8_lossy(&bytes);
                format!(
                    "Last {} lines of pdflatex log:\n{}",
                    LOG_TAIL_LINES,
                    log_tail(&log, LOG_TAIL_LINES)
                )
            }
            Err(_) => format!("stdout:\n{}\n\nstderr:\n{}", output.stdout, output.stderr),
        };
        let tex_errors = tex_error_lines(&detail);
        tracing::debug!("pdflatex produced no PDF; {} error line(s)", tex_errors.len());
        Err(ExportError::CompileError { detail, tex_errors })
    }
}

#[async_trait]
impl TexCompiler for PdfLatexCompiler {
    async fn generate_pdf(&self, snippet: &Snippet) -> Result<Artifact> {
        // Fail before creating anything when the compiler is missing.
        self.runner.resolve()?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("latex_");
        let work_dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        tracing::debug!(
            "Compiling {} snippet in {}",
            snippet.mode(),
            work_dir.path().display()
        );

        let result = self.compile_in(work_dir.path(), snippet).await;

        if let Err(e) = work_dir.close() {
            tracing::warn!("Could not remove temporary directory: {}", e);
        }
        result
    }
}

/// Last `n` lines of `text`, newline-terminated.
pub fn log_tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..]
        .iter()
        .map(|line| format!("{}\n", line))
        .collect()
}

pub fn tex_error_lines(text: &str) -> Vec<String> {
    TEX_ERROR_LINE
        .find_iter(text)
        .map(|m| m.as_str().trim_end().to_string())
        .collect()
}
