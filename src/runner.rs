use anyhow::{bail, Result};
use camino::Utf8Path;
use espidf_patch_driver::{HostPlatform, PatchTool};
use serde::Serialize;

use crate::applier::{apply_entry, ApplyStatus};
use crate::config::Config;
use crate::registry::{self, PatchEntry};

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
    pub emit_json: bool,
}

#[derive(Debug, Serialize)]
struct PatchReport {
    name: String,
    patch_file: String,
    target_dir: String,
    status: String,
}

#[derive(Debug, Default, Serialize)]
struct ApplySummary {
    dry_run: bool,
    platform: String,
    tool: String,
    patches: Vec<PatchReport>,
}

pub fn run_apply(cfg: &Config, opts: ApplyOptions) -> Result<()> {
    let framework_dir = cfg.framework_dir()?;

    println!("espidf-patchsmith apply");
    println!("  project dir  : {}", cfg.project_dir);
    println!("  framework dir: {framework_dir}");
    println!("  dry-run      : {}", opts.dry_run);

    let tool = resolve_tool(cfg)?;
    println!("detected platform: {}", tool.platform().label());
    println!("patch tool: {}", tool.command());

    let mut summary = ApplySummary {
        dry_run: opts.dry_run,
        platform: tool.platform().label().to_string(),
        tool: tool.command().to_string(),
        patches: Vec::new(),
    };
    apply_all(
        registry::PATCHES,
        &tool,
        &cfg.patches_dir,
        framework_dir,
        opts.dry_run,
        &mut summary,
    )?;

    if opts.emit_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Strictly sequential: later patches may assume earlier ones already
/// landed in the same tree, and any failure aborts the remainder.
fn apply_all(
    entries: &[PatchEntry],
    tool: &PatchTool,
    patches_dir: &Utf8Path,
    framework_dir: &Utf8Path,
    dry_run: bool,
    summary: &mut ApplySummary,
) -> Result<()> {
    println!("{} patches registered", entries.len());
    for entry in entries {
        let target_dir = entry.target_dir(framework_dir);
        println!("processing {} ({})", entry.name, entry.patch_file);
        let status = apply_entry(entry, tool, patches_dir, framework_dir, dry_run)?;
        match status {
            ApplyStatus::Applied => println!("  applied to {target_dir}"),
            ApplyStatus::AlreadyApplied => println!("  already applied; skipping"),
            ApplyStatus::WouldApply => println!("  would apply to {target_dir} (dry-run)"),
        }
        summary.patches.push(PatchReport {
            name: entry.name.to_string(),
            patch_file: entry.patch_file.to_string(),
            target_dir: target_dir.into_string(),
            status: status.label().to_string(),
        });
    }
    Ok(())
}

fn resolve_tool(cfg: &Config) -> Result<PatchTool> {
    let platform = HostPlatform::from_identifier(&cfg.host_os);
    match &cfg.patch_tool {
        Some(command) => Ok(PatchTool::with_command(platform, command.clone())),
        None => PatchTool::detect(platform),
    }
}

fn print_summary(summary: &ApplySummary) {
    println!("\nSummary:");
    println!("  platform: {}", summary.platform);
    println!("  tool    : {}", summary.tool);
    println!("  dry-run : {}", summary.dry_run);
    println!("  patches :");
    for report in &summary.patches {
        println!(
            "    - {:<16} {:<16} {}",
            report.name, report.status, report.target_dir
        );
    }
}

#[derive(Debug, Serialize)]
struct PatchCheck {
    name: String,
    patch_file_present: bool,
    marker_present: Option<bool>,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    platform: String,
    tool: Option<String>,
    tool_error: Option<String>,
    tool_on_path: Option<String>,
    project_dir: String,
    patches_dir: String,
    patches_dir_exists: bool,
    framework_dir: Option<String>,
    framework_dir_exists: Option<bool>,
    patches_registered: usize,
    patches: Vec<PatchCheck>,
}

/// Diagnostic command; never mutates, and an unresolvable tool is reported
/// rather than fatal.
pub fn run_doctor(cfg: &Config) -> Result<()> {
    let platform = HostPlatform::from_identifier(&cfg.host_os);
    let (tool, tool_error) = match resolve_tool(cfg) {
        Ok(tool) => (Some(tool), None),
        Err(err) => (None, Some(format!("{err:#}"))),
    };
    let framework_dir = cfg.framework_dir.as_deref();

    let report = DoctorReport {
        platform: platform.label().to_string(),
        tool: tool.as_ref().map(|t| t.command().to_string()),
        tool_error,
        tool_on_path: tool
            .as_ref()
            .and_then(|t| t.locate())
            .map(|path| path.into_string()),
        project_dir: cfg.project_dir.to_string(),
        patches_dir: cfg.patches_dir.to_string(),
        patches_dir_exists: cfg.patches_dir.is_dir(),
        framework_dir: framework_dir.map(|dir| dir.to_string()),
        framework_dir_exists: framework_dir.map(|dir| dir.is_dir()),
        patches_registered: registry::PATCHES.len(),
        patches: registry::PATCHES
            .iter()
            .map(|entry| PatchCheck {
                name: entry.name.to_string(),
                patch_file_present: cfg.patches_dir.join(entry.patch_file).is_file(),
                marker_present: framework_dir.map(|dir| {
                    entry
                        .target_dir(dir)
                        .join(entry.marker_file_name())
                        .exists()
                }),
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn run_list_patches() -> Result<()> {
    for entry in registry::PATCHES {
        println!(
            "- {:<16} {:<24} -> {}",
            entry.name,
            entry.patch_file,
            if entry.target_subdir.is_empty() {
                "<framework root>"
            } else {
                entry.target_subdir
            }
        );
    }
    Ok(())
}

pub fn run_explain_patch(name: &str) -> Result<()> {
    let Some(entry) = registry::find(name) else {
        bail!("no registered patch named {name}");
    };
    println!("Patch: {}", entry.name);
    println!("  description : {}", entry.description);
    println!("  patch file  : {}", entry.patch_file);
    println!(
        "  target dir  : {}",
        if entry.target_subdir.is_empty() {
            "<framework root>"
        } else {
            entry.target_subdir
        }
    );
    println!("  marker file : {}", entry.marker_file_name());
    Ok(())
}
