use crate::utils::error::{ExportError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesktopAction {
    /// Open a file with its default application.
    Open(PathBuf),
    /// Show a file selected in the file manager.
    Reveal(PathBuf),
    OpenFolder(PathBuf),
}

impl DesktopAction {
    pub fn target(&self) -> &Path {
        match self {
            DesktopAction::Open(path)
            | DesktopAction::Reveal(path)
            | DesktopAction::OpenFolder(path) => path,
        }
    }

    pub fn describe(&self) -> String {
        let name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        };
        match self {
            DesktopAction::Open(path) => format!("Opened: {}", name(path)),
            DesktopAction::Reveal(path) => format!("Selected in file manager: {}", name(path)),
            DesktopAction::OpenFolder(path) => format!("Opened: {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// The program and arguments that perform `action` on `platform`.
pub fn command_for(action: &DesktopAction, platform: Platform) -> (String, Vec<OsString>) {
    let target = action.target().as_os_str().to_owned();
    match (platform, action) {
        (Platform::Windows, DesktopAction::Reveal(_)) => {
            let mut select = OsString::from("/select,");
            select.push(&target);
            ("explorer".to_string(), vec![select])
        }
        (Platform::Windows, _) => (
            "cmd".to_string(),
            vec!["/C".into(), "start".into(), "".into(), target],
        ),
        (Platform::MacOs, DesktopAction::Reveal(_)) => {
            ("open".to_string(), vec!["-R".into(), target])
        }
        (Platform::MacOs, _) => ("open".to_string(), vec![target]),
        // xdg-open has no "select" mode; open the containing folder instead.
        (Platform::Linux, DesktopAction::Reveal(path)) => {
            let folder = path
                .parent()
                .map(|p| p.as_os_str().to_owned())
                .unwrap_or(target);
            ("xdg-open".to_string(), vec![folder])
        }
        (Platform::Linux, _) => ("xdg-open".to_string(), vec![target]),
    }
}

pub trait Launcher: Send + Sync {
    fn launch(&self, action: &DesktopAction) -> Result<()>;
}

/// Hands files to the platform's file manager / default viewer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, action: &DesktopAction) -> Result<()> {
        if !action.target().exists() {
            return Err(ExportError::NothingToOpenError {
                path: action.target().to_path_buf(),
            });
        }

        let (program, args) = command_for(action, Platform::current());
        tracing::debug!("Launching {} {:?}", program, args);
        Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}
