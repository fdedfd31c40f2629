#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::{Dpi, MathMode};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_CONFIG_FILE: &str = "latex-export.toml";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_TIMEOUT_SECONDS: u64 = 600;
pub const OUTPUT_DIR_NAME: &str = "latex_exports";

pub fn default_pdflatex() -> &'static str {
    "pdflatex"
}

pub fn default_ghostscript() -> &'static str {
    if cfg!(windows) {
        "gswin64c"
    } else {
        "gs"
    }
}

/// `<Desktop>/latex_exports`, or `<home>/latex_exports` where there is no
/// desktop directory.
pub fn default_output_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .map(|base| base.join(OUTPUT_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(OUTPUT_DIR_NAME))
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub pdflatex: Option<String>,
    pub ghostscript: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub timeout_seconds: Option<u64>,
    pub mode: Option<MathMode>,
    pub dpi: Option<Dpi>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub pdflatex: String,
    pub ghostscript: String,
    pub output_dir: PathBuf,
    pub timeout_seconds: u64,
    pub mode: MathMode,
    pub dpi: Dpi,
    pub extra_packages: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pdflatex: default_pdflatex().to_string(),
            ghostscript: default_ghostscript().to_string(),
            output_dir: default_output_dir(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            mode: MathMode::default(),
            dpi: Dpi::default(),
            extra_packages: Vec::new(),
        }
    }
}

impl Settings {
    /// Layers defaults, then the file, then command-line overrides.
    pub fn resolve(file: TomlConfig, overrides: &Overrides) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(pdflatex) = file.tools.pdflatex {
            settings.pdflatex = pdflatex;
        }
        if let Some(ghostscript) = file.tools.ghostscript {
            settings.ghostscript = ghostscript;
        }
        if let Some(timeout) = file.tools.timeout_seconds {
            settings.timeout_seconds = timeout;
        }
        if let Some(directory) = file.output.directory {
            settings.output_dir = PathBuf::from(directory);
        }
        if let Some(mode) = file.render.mode {
            settings.mode = mode.parse()?;
        }
        if let Some(dpi) = file.render.dpi {
            settings.dpi = Dpi::new(dpi)?;
        }
        if let Some(packages) = file.render.extra_packages {
            settings.extra_packages = packages;
        }

        if let Some(pdflatex) = &overrides.pdflatex {
            settings.pdflatex = pdflatex.clone();
        }
        if let Some(ghostscript) = &overrides.ghostscript {
            settings.ghostscript = ghostscript.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(timeout) = overrides.timeout_seconds {
            settings.timeout_seconds = timeout;
        }
        if let Some(mode) = overrides.mode {
            settings.mode = mode;
        }
        if let Some(dpi) = overrides.dpi {
            settings.dpi = dpi;
        }

        Ok(settings)
    }

    /// Reads `path` if given, else `latex-export.toml` in the working
    /// directory when it exists, else uses defaults only.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let file = match path {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path.display());
                TomlConfig::from_file(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                tracing::debug!("Using {} from working directory", DEFAULT_CONFIG_FILE);
                TomlConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => TomlConfig::default(),
        };
        Self::resolve(file, overrides)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_path("tools.pdflatex", &self.pdflatex)?;
        validation::validate_path("tools.ghostscript", &self.ghostscript)?;
        validation::validate_path("output.directory", &self.output_dir.to_string_lossy())?;
        validation::validate_range(
            "tools.timeout_seconds",
            self.timeout_seconds,
            1,
            MAX_TIMEOUT_SECONDS,
        )?;
        for package in &self.extra_packages {
            validation::validate_package_name("render.extra_packages", package)?;
        }
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn pdflatex(&self) -> &str {
        &self.pdflatex
    }

    fn ghostscript(&self) -> &str {
        &self.ghostscript
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn extra_packages(&self) -> &[String] {
        &self.extra_packages
    }
}
