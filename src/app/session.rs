//! Interactive terminal session: a text buffer for the snippet, a status log,
//! and one background export at a time.

use crate::app::desktop::{DesktopAction, Launcher};
use crate::core::exporter::{ExportJob, ExportRequest, Exporter};
use crate::domain::model::{Dpi, ExportOutcome, MathMode, Snippet, StatusLine, StatusTag};
use crate::utils::error::{ExportError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const PLACEHOLDER: &str = "\\frac{a}{b}";

pub const HELP: &str = "\
Type LaTeX math on one or more lines, then:
  :pdf             compile the buffer to PDF
  :png             compile and rasterize to PNG
  :mode M          inline | display
  :dpi N           300 | 600 | 1200
  :show            print buffer and settings
  :clear           empty the buffer
  :open            open the last PDF
  :reveal          show the last PDF in the file manager
  :folder          open the output folder
  :path            print the last output path
  :quit            leave";

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionCommand {
    Generate { png: bool },
    Mode(String),
    Dpi(String),
    Show,
    Clear,
    Open,
    Reveal,
    Folder,
    Path,
    Help,
    Quit,
    Unknown(String),
}

impl SessionCommand {
    fn parse(line: &str) -> Self {
        let mut parts = line.trim_start_matches(':').split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().unwrap_or_default().to_string();
        match name {
            "pdf" => SessionCommand::Generate { png: false },
            "png" => SessionCommand::Generate { png: true },
            "mode" => SessionCommand::Mode(arg),
            "dpi" => SessionCommand::Dpi(arg),
            "show" => SessionCommand::Show,
            "clear" => SessionCommand::Clear,
            "open" => SessionCommand::Open,
            "reveal" => SessionCommand::Reveal,
            "folder" => SessionCommand::Folder,
            "path" => SessionCommand::Path,
            "help" | "h" => SessionCommand::Help,
            "quit" | "q" | "exit" => SessionCommand::Quit,
            other => SessionCommand::Unknown(other.to_string()),
        }
    }
}

pub struct Session {
    exporter: Exporter,
    launcher: Arc<dyn Launcher>,
    output_dir: PathBuf,
    buffer: String,
    placeholder: bool,
    mode: MathMode,
    dpi: Dpi,
    last: Option<ExportOutcome>,
    status: Vec<StatusLine>,
    // Set while a PNG export is compiling; taken when its PDF arrives.
    pending_png: Option<Dpi>,
    converting: bool,
}

impl Session {
    pub fn new(
        exporter: Exporter,
        launcher: Arc<dyn Launcher>,
        output_dir: PathBuf,
        mode: MathMode,
        dpi: Dpi,
    ) -> Self {
        Self {
            exporter,
            launcher,
            output_dir,
            buffer: PLACEHOLDER.to_string(),
            placeholder: true,
            mode,
            dpi,
            last: None,
            status: Vec::new(),
            pending_png: None,
            converting: false,
        }
    }

    pub fn status(&self) -> &[StatusLine] {
        &self.status
    }

    pub fn last_outcome(&self) -> Option<&ExportOutcome> {
        self.last.as_ref()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Reads lines until `:quit` or end of input. A job still running at
    /// end of input is waited for so its result is not lost.
    pub async fn run<R, W>(&mut self, mut input: R, mut out: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        // Survives a cancelled read so a partial line is not lost.
        let mut pending = Vec::new();
        let mut job: Option<ExportJob> = None;

        write_line(&mut out, "LaTeX math to PDF. Type :help for commands.").await?;

        loop {
            tokio::select! {
                read = input.read_until(b'\n', &mut pending) => {
                    if read? == 0 && pending.is_empty() {
                        break;
                    }
                    match String::from_utf8(std::mem::take(&mut pending)) {
                        Ok(line) => {
                            let line = line.trim_end_matches(['\r', '\n']);
                            if !self.handle_line(line, &mut job, &mut out).await? {
                                break;
                            }
                        }
                        Err(_) => {
                            let text = "Input is not valid UTF-8; line ignored".to_string();
                            self.log(&mut out, StatusTag::Error, text).await?;
                        }
                    }
                }
                outcome = join_job(&mut job), if job.is_some() => {
                    job = None;
                    self.finish_job(outcome, &mut job, &mut out).await?;
                }
            }
        }

        while let Some(mut running) = job.take() {
            let outcome = running.join().await;
            self.finish_job(outcome, &mut job, &mut out).await?;
        }
        out.flush().await?;
        Ok(())
    }

    /// Returns `false` when the session should end.
    async fn handle_line<W: AsyncWrite + Unpin>(
        &mut self,
        line: &str,
        job: &mut Option<ExportJob>,
        out: &mut W,
    ) -> Result<bool> {
        if !line.starts_with(':') {
            if self.placeholder {
                self.buffer.clear();
                self.placeholder = false;
            }
            if !self.buffer.is_empty() {
                self.buffer.push('\n');
            }
            self.buffer.push_str(line);
            return Ok(true);
        }

        match SessionCommand::parse(line) {
            SessionCommand::Generate { png } => self.start_job(png, job, out).await?,
            SessionCommand::Mode(arg) => match arg.parse::<MathMode>() {
                Ok(mode) => {
                    self.mode = mode;
                    self.log(out, StatusTag::Info, format!("Mode: {}", mode)).await?;
                }
                Err(e) => self.log(out, StatusTag::Error, e.to_string()).await?,
            },
            SessionCommand::Dpi(arg) => match arg.parse::<Dpi>() {
                Ok(dpi) => {
                    self.dpi = dpi;
                    self.log(out, StatusTag::Info, format!("DPI: {}", dpi)).await?;
                }
                Err(e) => self.log(out, StatusTag::Error, e.to_string()).await?,
            },
            SessionCommand::Show => {
                let summary = format!(
                    "Mode: {}  DPI: {}  Output: {}\n{}",
                    self.mode,
                    self.dpi,
                    self.output_dir.display(),
                    self.buffer
                );
                write_line(out, &summary).await?;
            }
            SessionCommand::Clear => {
                self.buffer.clear();
                self.placeholder = false;
                self.log(out, StatusTag::Info, "Buffer cleared".to_string()).await?;
            }
            SessionCommand::Open => self.launch_last(false, out).await?,
            SessionCommand::Reveal => self.launch_last(true, out).await?,
            SessionCommand::Folder => {
                tokio::fs::create_dir_all(&self.output_dir).await?;
                let action = DesktopAction::OpenFolder(self.output_dir.clone());
                self.launch(action, out).await?;
            }
            SessionCommand::Path => {
                let path = self
                    .last
                    .as_ref()
                    .map(|outcome| outcome.primary().path.display().to_string());
                match path {
                    Some(path) => write_line(out, &path).await?,
                    None => self.log_error(out, &nothing_generated()).await?,
                }
            }
            SessionCommand::Help => write_line(out, HELP).await?,
            SessionCommand::Quit => return Ok(false),
            SessionCommand::Unknown(name) => {
                self.log(
                    out,
                    StatusTag::Error,
                    format!("Unknown command ':{}'. Type :help", name),
                )
                .await?
            }
        }
        Ok(true)
    }

    async fn start_job<W: AsyncWrite + Unpin>(
        &mut self,
        png: bool,
        job: &mut Option<ExportJob>,
        out: &mut W,
    ) -> Result<()> {
        if job.is_some() {
            return self
                .log(
                    out,
                    StatusTag::Error,
                    "A compile job is already running".to_string(),
                )
                .await;
        }

        self.status.clear();
        let snippet = match Snippet::new(&self.buffer, self.mode) {
            Ok(snippet) => snippet,
            Err(e) => return self.log_error(out, &e).await,
        };

        self.pending_png = png.then_some(self.dpi);
        self.log(out, StatusTag::Info, "Compiling...".to_string()).await?;
        *job = Some(self.exporter.spawn(ExportRequest::Pdf(snippet)));
        Ok(())
    }

    /// A PNG export runs as two jobs: the PDF is reported and kept as soon
    /// as it exists, then rasterized.
    async fn finish_job<W: AsyncWrite + Unpin>(
        &mut self,
        outcome: Result<ExportOutcome>,
        job: &mut Option<ExportJob>,
        out: &mut W,
    ) -> Result<()> {
        let converted = std::mem::take(&mut self.converting);
        match outcome {
            Ok(outcome) => {
                let message = match &outcome.png {
                    Some(png) => png.message.clone(),
                    None => outcome.pdf.message.clone(),
                };
                self.log(out, StatusTag::Success, message).await?;
                if let Some(dpi) = self.pending_png.take() {
                    let text = "PDF OK. Converting to PNG...".to_string();
                    self.log(out, StatusTag::Info, text).await?;
                    let request = ExportRequest::Convert(outcome.pdf.clone(), dpi);
                    *job = Some(self.exporter.spawn(request));
                    self.converting = true;
                }
                self.last = Some(outcome);
            }
            Err(e) => {
                tracing::debug!("Export failed: {:?}", e);
                self.pending_png = None;
                if !converted {
                    self.last = None;
                }
                self.log_error(out, &e).await?;
            }
        }
        Ok(())
    }

    async fn launch_last<W: AsyncWrite + Unpin>(
        &mut self,
        reveal: bool,
        out: &mut W,
    ) -> Result<()> {
        let Some(pdf) = self.last.as_ref().map(|o| o.pdf.path.clone()) else {
            return self.log_error(out, &nothing_generated()).await;
        };
        let action = if reveal {
            DesktopAction::Reveal(pdf)
        } else {
            DesktopAction::Open(pdf)
        };
        self.launch(action, out).await
    }

    async fn launch<W: AsyncWrite + Unpin>(
        &mut self,
        action: DesktopAction,
        out: &mut W,
    ) -> Result<()> {
        match self.launcher.launch(&action) {
            Ok(()) => self.log(out, StatusTag::Info, action.describe()).await,
            Err(e) => self.log_error(out, &e).await,
        }
    }

    async fn log_error<W: AsyncWrite + Unpin>(
        &mut self,
        out: &mut W,
        err: &ExportError,
    ) -> Result<()> {
        self.log(out, StatusTag::Error, err.user_friendly_message())
            .await
    }

    async fn log<W: AsyncWrite + Unpin>(
        &mut self,
        out: &mut W,
        tag: StatusTag,
        text: String,
    ) -> Result<()> {
        let marker = match tag {
            StatusTag::Info => "ℹ️",
            StatusTag::Success => "✅",
            StatusTag::Error => "❌",
        };
        write_line(out, &format!("{} {}", marker, text)).await?;
        self.status.push(StatusLine { tag, text });
        Ok(())
    }
}

fn nothing_generated() -> ExportError {
    ExportError::NothingToOpenError {
        path: PathBuf::new(),
    }
}

async fn join_job(job: &mut Option<ExportJob>) -> Result<ExportOutcome> {
    match job {
        Some(job) => job.join().await,
        None => std::future::pending().await,
    }
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}
