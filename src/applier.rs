use anyhow::{bail, Context, Result};
use camino::Utf8Path;
use espidf_patch_driver::PatchTool;
use fs_err as fs;
use tracing::debug;

use crate::registry::PatchEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    /// Tool ran and the marker was written.
    Applied,
    /// Marker already present; tool not invoked.
    AlreadyApplied,
    /// Dry-run: preconditions checked, nothing mutated.
    WouldApply,
}

impl ApplyStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyApplied => "already applied",
            Self::WouldApply => "would apply",
        }
    }
}

/// Apply one registry entry, honoring the marker protocol. A missing patch
/// source is an error, not a skip; the only normal skip is an existing
/// marker.
pub fn apply_entry(
    entry: &PatchEntry,
    tool: &PatchTool,
    patches_dir: &Utf8Path,
    framework_dir: &Utf8Path,
    dry_run: bool,
) -> Result<ApplyStatus> {
    let patch_path = patches_dir.join(entry.patch_file);
    if !patch_path.is_file() {
        bail!("patch file {patch_path} not found");
    }

    let target_dir = entry.target_dir(framework_dir);
    let marker = target_dir.join(entry.marker_file_name());
    if marker.exists() {
        debug!("marker {marker} present; skipping {}", entry.name);
        return Ok(ApplyStatus::AlreadyApplied);
    }
    if dry_run {
        return Ok(ApplyStatus::WouldApply);
    }

    tool.apply(&patch_path, &target_dir)?;
    // Marker lands only after the tool reports success.
    fs::write(&marker, "").with_context(|| format!("writing marker {marker}"))?;
    Ok(ApplyStatus::Applied)
}
