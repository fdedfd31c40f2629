pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use app::session::Session;
pub use config::Settings;
pub use core::exporter::{ExportJob, ExportRequest, Exporter};
pub use domain::model::{Artifact, ArtifactKind, Dpi, ExportOutcome, MathMode, Snippet};
pub use utils::error::{ExportError, Result};
