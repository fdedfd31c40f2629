use crate::utils::error::{ExportError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// An external executable invoked with a hard timeout.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    name: String,
    configured: String,
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(name: &str, configured: &str, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            configured: configured.to_string(),
            timeout,
        }
    }

    pub fn resolve(&self) -> Result<PathBuf> {
        resolve_executable(&self.configured)
            .ok_or_else(|| ExportError::tool_not_found(&self.name, self.configured.clone()))
    }

    /// Runs the tool to completion. A non-zero exit status is not an error
    /// here; callers judge success by the files the tool leaves behind.
    pub async fn run<I, S>(&self, args: I, cwd: Option<&Path>) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let program = self.resolve()?;
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        tracing::debug!("Running {} ({}) with {:?}", self.name, program.display(), args);

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => output?,
            Err(_) => {
                tracing::warn!("⏱️ {} exceeded {:?}, killed", self.name, self.timeout);
                return Err(ExportError::timeout(&self.name, self.timeout.as_secs()));
            }
        };

        tracing::debug!(
            "{} finished in {:?} with status {}",
            self.name,
            started.elapsed(),
            output.status
        );

        Ok(ToolOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A value with a path separator must name an existing file; a bare name
/// is searched on `PATH`.
pub fn resolve_executable(configured: &str) -> Option<PathBuf> {
    let candidate = Path::new(configured);
    if configured.is_empty() {
        return None;
    }
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        executable_names(configured)
            .into_iter()
            .map(|name| dir.join(name))
            .find(|full| full.is_file())
    })
}

fn executable_names(name: &str) -> Vec<String> {
    if cfg!(windows) && Path::new(name).extension().is_none() {
        vec![format!("{}.exe", name), format!("{}.bat", name), name.to_string()]
    } else {
        vec![name.to_string()]
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_missing_absolute_path() {
        assert!(resolve_executable("/definitely/not/here/pdflatex").is_none());
        assert!(resolve_executable("").is_none());
    }

    #[test]
    fn test_resolve_bare_name_on_path() {
        assert!(resolve_executable("sh").is_some());
        assert!(resolve_executable("no-such-tool-4f1c2a").is_none());
    }

    #[tokio::test]
    async fn test_run_captures_output() {
        let runner = ToolRunner::new("shell", "sh", DEFAULT_TIMEOUT);
        let output = runner
            .run(["-c", "echo out; echo err >&2; exit 3"], None)
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let runner = ToolRunner::new("shell", "sh", Duration::from_millis(200));
        let started = Instant::now();
        let err = runner.run(["-c", "sleep 5"], None).await.unwrap_err();
        assert!(matches!(err, ExportError::TimeoutError { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_run_missing_tool() {
        let runner = ToolRunner::new("pdflatex", "/nope/pdflatex", DEFAULT_TIMEOUT);
        let err = runner.run(Vec::<String>::new(), None).await.unwrap_err();
        match err {
            ExportError::ToolNotFoundError { tool, path } => {
                assert_eq!(tool, "pdflatex");
                assert_eq!(path, "/nope/pdflatex");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
