use std::process::Command;

use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;
use which::which;

const PATCH_BIN: &str = "patch";
const GIT_SYSTEM_PATCH: &str = r"C:\Program Files\Git\usr\bin\patch.exe";

/// Host families the build system can report. Anything that is not
/// Windows-like is assumed to carry a system `patch` on PATH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl HostPlatform {
    /// Classify a build-system host identifier (`win32`, `linux`, `darwin`, ...).
    /// Prefix match, so `linux2` and `windows` classify the same as their
    /// short forms.
    pub fn from_identifier(id: &str) -> Self {
        let id = id.to_ascii_lowercase();
        if id.starts_with("win") {
            Self::Windows
        } else if id.starts_with("linux") {
            Self::Linux
        } else if id.starts_with("darwin") || id.starts_with("mac") {
            Self::MacOs
        } else {
            Self::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::MacOs => "macOS",
            Self::Other => "Unix-like",
        }
    }
}

/// Resolved external patch command for one run.
#[derive(Debug, Clone)]
pub struct PatchTool {
    platform: HostPlatform,
    command: Utf8PathBuf,
}

impl PatchTool {
    /// Resolve the patch command for `platform`, one resolver per host
    /// family. Windows is the only family that probes the filesystem; the
    /// Unix-like families defer failure to the first invocation.
    pub fn detect(platform: HostPlatform) -> Result<Self> {
        match platform {
            HostPlatform::Windows => windows_tool(),
            HostPlatform::Linux | HostPlatform::MacOs | HostPlatform::Other => Ok(Self {
                platform,
                command: Utf8PathBuf::from(PATCH_BIN),
            }),
        }
    }

    /// Bypass platform resolution with an explicit command.
    pub fn with_command(platform: HostPlatform, command: impl Into<Utf8PathBuf>) -> Self {
        Self {
            platform,
            command: command.into(),
        }
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    pub fn command(&self) -> &Utf8Path {
        &self.command
    }

    /// PATH lookup for diagnostics; resolution itself never depends on it.
    pub fn locate(&self) -> Option<Utf8PathBuf> {
        which(self.command.as_std_path())
            .ok()
            .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
    }

    /// Run the tool against `patch_file` with strip level 1, using
    /// `target_dir` as the working directory. Non-zero exit is an error
    /// carrying the tool's stderr.
    pub fn apply(&self, patch_file: &Utf8Path, target_dir: &Utf8Path) -> Result<()> {
        let output = Command::new(self.command.as_std_path())
            .arg("-p1")
            .arg("-i")
            .arg(patch_file)
            .current_dir(target_dir)
            .output()
            .with_context(|| format!("running {} in {target_dir}", self.command))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} failed for {patch_file}: {}",
                self.command,
                stderr.trim()
            );
        }
        debug!("{} applied {patch_file} in {target_dir}", self.command);
        Ok(())
    }
}

fn windows_tool() -> Result<PatchTool> {
    let system = Utf8PathBuf::from(GIT_SYSTEM_PATCH);
    if system.is_file() {
        return Ok(PatchTool {
            platform: HostPlatform::Windows,
            command: system,
        });
    }
    // Git for Windows also installs per-user without admin rights.
    if let Ok(user) = std::env::var("USERNAME") {
        let per_user = Utf8PathBuf::from(format!(
            r"C:\Users\{user}\AppData\Local\Programs\Git\usr\bin\patch.exe"
        ));
        if per_user.is_file() {
            return Ok(PatchTool {
                platform: HostPlatform::Windows,
                command: per_user,
            });
        }
    }
    bail!("'patch' command not found, make sure git is installed on your machine")
}
