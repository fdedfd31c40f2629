use crate::domain::model::{Artifact, Dpi, Snippet};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub trait ConfigProvider: Send + Sync {
    fn pdflatex(&self) -> &str;
    fn ghostscript(&self) -> &str;
    fn output_dir(&self) -> &Path;
    fn timeout(&self) -> Duration;
    fn extra_packages(&self) -> &[String];
}

#[async_trait]
pub trait TexCompiler: Send + Sync {
    async fn generate_pdf(&self, snippet: &Snippet) -> Result<Artifact>;
}

#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn pdf_to_png(&self, pdf_path: &Path, dpi: Dpi) -> Result<Artifact>;
}
