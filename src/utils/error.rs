use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("{tool} not found at: {path}")]
    ToolNotFoundError { tool: String, path: String },

    #[error("PDF generation failed.\n\n{detail}")]
    CompileError { detail: String, tex_errors: Vec<String> },

    #[error("{tool} timed out (>{seconds}s)")]
    TimeoutError { tool: String, seconds: u64 },

    #[error("PNG generation failed.\n\nGhostscript output:\n{output}")]
    RasterizeError { output: String },

    #[error("Please enter LaTeX code")]
    EmptyInputError,

    #[error("No PDF generated yet: {}", path.display())]
    NothingToOpenError { path: PathBuf },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Tooling,
    Input,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExportError {
    pub fn tool_not_found(tool: &str, path: impl Into<String>) -> Self {
        Self::ToolNotFoundError {
            tool: tool.to_string(),
            path: path.into(),
        }
    }

    pub fn timeout(tool: &str, seconds: u64) -> Self {
        Self::TimeoutError {
            tool: tool.to_string(),
            seconds,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ToolNotFoundError { .. }
            | Self::TimeoutError { .. }
            | Self::RasterizeError { .. } => ErrorCategory::Tooling,
            Self::CompileError { .. } | Self::EmptyInputError | Self::NothingToOpenError { .. } => {
                ErrorCategory::Input
            }
            Self::InvalidConfigValueError { .. } | Self::ConfigValidationError { .. } => {
                ErrorCategory::Configuration
            }
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::EmptyInputError | Self::NothingToOpenError { .. } => ErrorSeverity::Low,
            Self::TimeoutError { .. } => ErrorSeverity::Medium,
            Self::CompileError { .. }
            | Self::RasterizeError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorSeverity::High,
            Self::ToolNotFoundError { .. } | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ToolNotFoundError { tool, .. } if tool == "pdflatex" => {
                "Install a TeX distribution (MiKTeX: https://miktex.org/, TeX Live: https://tug.org/texlive/) or set tools.pdflatex".to_string()
            }
            Self::ToolNotFoundError { .. } => {
                "Install Ghostscript from https://ghostscript.com/ or set tools.ghostscript".to_string()
            }
            Self::CompileError { .. } => {
                "Check the LaTeX snippet for typos, unbalanced braces or unknown commands".to_string()
            }
            Self::TimeoutError { .. } => {
                "The tool may be waiting for a package download; run it once by hand or raise tools.timeout_seconds".to_string()
            }
            Self::RasterizeError { .. } => {
                "Verify the PDF opens in a viewer and that Ghostscript supports the pngalpha device".to_string()
            }
            Self::EmptyInputError => "Type a math expression such as \\frac{a}{b}".to_string(),
            Self::NothingToOpenError { .. } => "Generate a PDF first".to_string(),
            Self::InvalidConfigValueError { field, .. }
            | Self::ConfigValidationError { field, .. } => {
                format!("Fix the '{}' setting in the config file or on the command line", field)
            }
            Self::IoError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ToolNotFoundError { tool, path } => {
                format!("{} not found at:\n{}", tool, path)
            }
            Self::TimeoutError { tool, seconds } => {
                format!("Error: {} timed out (>{}s)", tool, seconds)
            }
            Self::EmptyInputError => "Error: Please enter LaTeX code".to_string(),
            Self::NothingToOpenError { .. } => {
                "No PDF generated yet. Generate a PDF first.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
