use crate::config::Overrides;
use crate::domain::model::{Dpi, MathMode};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "latex-export", version)]
#[command(about = "Turn LaTeX math snippets into tightly cropped PDF and transparent PNG files")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// pdflatex executable (path or name on PATH)
    #[arg(long, global = true)]
    pub pdflatex: Option<String>,

    /// Ghostscript executable (path or name on PATH)
    #[arg(long, global = true)]
    pub ghostscript: Option<String>,

    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Per-tool timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile a snippet to PDF
    Pdf(SnippetArgs),
    /// Compile a snippet to PDF and rasterize it to PNG
    Png {
        #[command(flatten)]
        snippet: SnippetArgs,
        /// 300, 600 or 1200
        #[arg(long)]
        dpi: Option<Dpi>,
    },
    /// Rasterize an existing PDF
    Rasterize {
        pdf: PathBuf,
        #[arg(long)]
        dpi: Option<Dpi>,
    },
    /// Interactive editing session (default)
    Session,
    /// Open the output folder in the file manager
    OpenFolder,
    /// Check that both tools resolve and the output folder is writable
    Check,
}

#[derive(Debug, Clone, Args)]
pub struct SnippetArgs {
    /// LaTeX math code; read from --file or stdin when omitted
    pub code: Option<String>,

    #[arg(long, conflicts_with = "code")]
    pub file: Option<PathBuf>,

    /// inline or display
    #[arg(long)]
    pub mode: Option<MathMode>,
}

impl SnippetArgs {
    pub fn read_code(&self) -> std::io::Result<String> {
        if let Some(code) = &self.code {
            return Ok(code.clone());
        }
        if let Some(file) = &self.file {
            return std::fs::read_to_string(file);
        }
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    }
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let (mode, dpi) = match &self.command {
            Some(Command::Pdf(snippet)) => (snippet.mode, None),
            Some(Command::Png { snippet, dpi }) => (snippet.mode, *dpi),
            Some(Command::Rasterize { dpi, .. }) => (None, *dpi),
            _ => (None, None),
        };
        Overrides {
            pdflatex: self.pdflatex.clone(),
            ghostscript: self.ghostscript.clone(),
            output_dir: self.output_dir.clone(),
            timeout_seconds: self.timeout,
            mode,
            dpi,
        }
    }
}
