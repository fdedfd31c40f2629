use crate::utils::error::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathMode {
    Inline,
    #[default]
    Display,
}

impl fmt::Display for MathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathMode::Inline => write!(f, "inline"),
            MathMode::Display => write!(f, "display"),
        }
    }
}

impl FromStr for MathMode {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(MathMode::Inline),
            "display" => Ok(MathMode::Display),
            other => Err(ExportError::InvalidConfigValueError {
                field: "mode".to_string(),
                value: other.to_string(),
                reason: "Expected 'inline' or 'display'".to_string(),
            }),
        }
    }
}

/// Raster resolution offered for PNG export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Dpi(u32);

impl Dpi {
    pub const SUPPORTED: [u32; 3] = [300, 600, 1200];

    pub fn new(value: u32) -> Result<Self> {
        crate::utils::validation::validate_one_of("dpi", value, &Self::SUPPORTED)?;
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Dpi {
    fn default() -> Self {
        Self(600)
    }
}

impl TryFrom<u32> for Dpi {
    type Error = ExportError;

    fn try_from(value: u32) -> Result<Self> {
        Dpi::new(value)
    }
}

impl From<Dpi> for u32 {
    fn from(dpi: Dpi) -> u32 {
        dpi.0
    }
}

impl fmt::Display for Dpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Dpi {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s
            .trim()
            .parse::<u32>()
            .map_err(|e| ExportError::InvalidConfigValueError {
                field: "dpi".to_string(),
                value: s.to_string(),
                reason: e.to_string(),
            })?;
        Dpi::new(value)
    }
}

/// A math fragment as typed by the user. Never empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    code: String,
    mode: MathMode,
}

impl Snippet {
    pub fn new(code: &str, mode: MathMode) -> Result<Self> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ExportError::EmptyInputError);
        }
        Ok(Self {
            code: code.to_string(),
            mode,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn mode(&self) -> MathMode {
        self.mode
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Pdf,
    Png,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub message: String,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, path: PathBuf) -> Self {
        let label = match kind {
            ArtifactKind::Pdf => "PDF",
            ArtifactKind::Png => "PNG",
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            kind,
            message: format!("{} generated successfully:\n{}", label, name),
            path,
        }
    }
}

/// Outcome of `generate_png`: the intermediate PDF is kept next to the PNG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub pdf: Artifact,
    pub png: Option<Artifact>,
}

impl ExportOutcome {
    /// The file a user most likely wants to open next.
    pub fn primary(&self) -> &Artifact {
        self.png.as_ref().unwrap_or(&self.pdf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub tag: StatusTag,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_trims_and_rejects_empty() {
        let snippet = Snippet::new("  \\frac{a}{b}\n", MathMode::Inline).unwrap();
        assert_eq!(snippet.code(), "\\frac{a}{b}");
        assert!(matches!(
            Snippet::new(" \n\t", MathMode::Display),
            Err(ExportError::EmptyInputError)
        ));
    }

    #[test]
    fn test_dpi_parsing() {
        assert_eq!("1200".parse::<Dpi>().unwrap().value(), 1200);
        assert!("72".parse::<Dpi>().is_err());
        assert!("abc".parse::<Dpi>().is_err());
        assert_eq!(Dpi::default().value(), 600);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Inline".parse::<MathMode>().unwrap(), MathMode::Inline);
        assert_eq!(MathMode::default(), MathMode::Display);
        assert!("block".parse::<MathMode>().is_err());
    }

    #[test]
    fn test_artifact_message_uses_file_name() {
        let artifact = Artifact::new(
            ArtifactKind::Png,
            PathBuf::from("/out/equation_20260101_120000.png"),
        );
        assert_eq!(
            artifact.message,
            "PNG generated successfully:\nequation_20260101_120000.png"
        );
    }

    #[test]
    fn test_artifact_serializes_kind_lowercase() {
        let artifact = Artifact::new(ArtifactKind::Pdf, PathBuf::from("/out/a.pdf"));
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["kind"], "pdf");
    }
}
