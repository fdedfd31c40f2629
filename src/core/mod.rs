pub mod compiler;
pub mod document;
pub mod exporter;
pub mod output;
pub mod rasterizer;
pub mod runner;

pub use crate::domain::model::{Artifact, Dpi, ExportOutcome, MathMode, Snippet};
pub use crate::domain::ports::{ConfigProvider, Rasterizer, TexCompiler};
pub use crate::utils::error::Result;
