use anyhow::{anyhow, bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "patchsmith.toml";

#[derive(Debug, Deserialize, Default)]
struct PathsSection {
    #[serde(default)]
    framework_dir: Option<String>,
    #[serde(default)]
    patches_dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ToolSection {
    #[serde(default)]
    host_os: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    paths: PathsSection,
    #[serde(default)]
    tool: ToolSection,
}

/// CLI-provided values. `None` falls through to `patchsmith.toml`, then to
/// the defaults.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<Utf8PathBuf>,
    pub framework_dir: Option<Utf8PathBuf>,
    pub patches_dir: Option<Utf8PathBuf>,
    pub host_os: Option<String>,
    pub patch_tool: Option<Utf8PathBuf>,
}

/// Everything the run needs from the build environment, gathered once and
/// passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: Utf8PathBuf,
    pub patches_dir: Utf8PathBuf,
    pub framework_dir: Option<Utf8PathBuf>,
    pub host_os: String,
    pub patch_tool: Option<Utf8PathBuf>,
}

impl Config {
    pub fn resolve(project_dir: &Utf8Path, overrides: Overrides) -> Result<Self> {
        let config_path = overrides
            .config_file
            .clone()
            .unwrap_or_else(|| project_dir.join(CONFIG_FILE_NAME));
        let raw = if config_path.is_file() {
            let data = fs::read_to_string(&config_path)
                .with_context(|| format!("reading config {config_path}"))?;
            toml::from_str::<RawConfig>(&data)
                .with_context(|| format!("parsing {config_path}"))?
        } else if overrides.config_file.is_some() {
            // An explicitly named config must exist; the default one may not.
            bail!("config {config_path} not found");
        } else {
            RawConfig::default()
        };

        let patches_dir = overrides
            .patches_dir
            .or_else(|| {
                raw.paths
                    .patches_dir
                    .map(|dir| resolve_path(project_dir, dir))
            })
            .unwrap_or_else(|| project_dir.join("patches"));
        let framework_dir = overrides.framework_dir.or_else(|| {
            raw.paths
                .framework_dir
                .map(|dir| resolve_path(project_dir, dir))
        });
        let host_os = overrides
            .host_os
            .or(raw.tool.host_os)
            .unwrap_or_else(|| std::env::consts::OS.to_string());
        let patch_tool = overrides
            .patch_tool
            .or_else(|| raw.tool.path.map(Utf8PathBuf::from));

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            patches_dir,
            framework_dir,
            host_os,
            patch_tool,
        })
    }

    /// `apply` and `doctor` need the vendored tree; `registry` does not.
    pub fn framework_dir(&self) -> Result<&Utf8Path> {
        self.framework_dir.as_deref().ok_or_else(|| {
            anyhow!(
                "framework directory not configured; pass --framework-dir \
                 or set paths.framework_dir in {CONFIG_FILE_NAME}"
            )
        })
    }
}

fn resolve_path(base: &Utf8Path, value: impl Into<Utf8PathBuf>) -> Utf8PathBuf {
    let candidate = value.into();
    if candidate.is_absolute() {
        candidate
    } else {
        base.join(candidate)
    }
}
