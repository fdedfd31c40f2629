use crate::core::runner::resolve_executable;
use crate::domain::ports::ConfigProvider;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct ToolCheck {
    pub name: String,
    pub configured: String,
    pub resolved: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReport {
    pub tools: Vec<ToolCheck>,
    pub output_dir: PathBuf,
    pub output_writable: bool,
}

impl EnvironmentReport {
    pub fn is_ready(&self) -> bool {
        self.output_writable && self.tools.iter().all(|t| t.resolved.is_some())
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for tool in &self.tools {
            match &tool.resolved {
                Some(path) => lines.push(format!("✅ {}: {}", tool.name, path.display())),
                None => lines.push(format!("❌ {} not found at: {}", tool.name, tool.configured)),
            }
        }
        let marker = if self.output_writable { "✅" } else { "❌" };
        lines.push(format!("{} output folder: {}", marker, self.output_dir.display()));
        lines.join("\n")
    }
}

fn check_tool(name: &str, configured: &str) -> ToolCheck {
    ToolCheck {
        name: name.to_string(),
        configured: configured.to_string(),
        resolved: resolve_executable(configured),
    }
}

/// Resolves both tools and probes the output folder by creating it and
/// writing a scratch file into it.
pub fn check_environment<C: ConfigProvider + ?Sized>(config: &C) -> EnvironmentReport {
    let output_dir = config.output_dir().to_path_buf();
    let output_writable = std::fs::create_dir_all(&output_dir).is_ok()
        && tempfile::NamedTempFile::new_in(&output_dir).is_ok();
    if !output_writable {
        tracing::warn!("Output folder {} is not writable", output_dir.display());
    }

    EnvironmentReport {
        tools: vec![
            check_tool("pdflatex", config.pdflatex()),
            check_tool("ghostscript", config.ghostscript()),
        ],
        output_dir,
        output_writable,
    }
}
