#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use assert_cmd::Command;

const PATCH_FILES: &[&str] = &["ds_idf.patch", "ds_mbedtls.patch", "mlkem_mbedtls.patch"];

struct Project {
    _guard: tempfile::TempDir,
    root: PathBuf,
    framework: PathBuf,
}

fn project() -> Project {
    let guard = tempfile::tempdir().unwrap();
    let root = guard.path().to_path_buf();
    let patches = root.join("patches");
    let framework = root.join("esp-idf");
    fs::create_dir_all(&patches).unwrap();
    fs::create_dir_all(framework.join("components/mbedtls/mbedtls")).unwrap();
    for name in PATCH_FILES {
        fs::write(patches.join(name), "--- a/x\n+++ b/x\n").unwrap();
    }
    Project {
        _guard: guard,
        root,
        framework,
    }
}

fn patchsmith(project: &Project, args: &[&str]) -> Output {
    Command::cargo_bin("espidf-patchsmith")
        .unwrap()
        .arg("--project-dir")
        .arg(&project.root)
        .arg("--framework-dir")
        .arg(&project.framework)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn markers(framework: &Path) -> [PathBuf; 3] {
    [
        framework.join(".ds_idf.patch-done"),
        framework.join("components/mbedtls/mbedtls/.ds_mbedtls.patch-done"),
        framework.join("components/mbedtls/mbedtls/.mlkem_mbedtls.patch-done"),
    ]
}

#[test]
fn fresh_tree_applies_all_then_skips() {
    let project = project();

    let first = patchsmith(&project, &["--patch-tool", "/bin/true", "apply"]);
    assert!(first.status.success(), "{}", stdout(&first));
    let out = stdout(&first);
    assert!(out.contains("detected platform:"));
    assert!(out.contains("patch tool: /bin/true"));
    assert!(out.contains("processing ds_idf (ds_idf.patch)"));
    for marker in markers(&project.framework) {
        assert!(marker.is_file(), "missing marker {}", marker.display());
    }

    let second = patchsmith(&project, &["--patch-tool", "/bin/true", "apply"]);
    assert!(second.status.success());
    let out = stdout(&second);
    assert_eq!(out.matches("already applied; skipping").count(), 3);
}

#[test]
fn tool_failure_aborts_the_run() {
    let project = project();
    let output = patchsmith(&project, &["--patch-tool", "/bin/false", "apply"]);
    assert!(!output.status.success());
    for marker in markers(&project.framework) {
        assert!(!marker.exists());
    }
}

#[test]
fn missing_source_aborts_after_earlier_entries() {
    let project = project();
    fs::remove_file(project.root.join("patches/mlkem_mbedtls.patch")).unwrap();

    let output = patchsmith(&project, &["--patch-tool", "/bin/true", "apply"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("mlkem_mbedtls.patch"));
    assert!(stderr.contains("not found"));

    let [first, second, third] = markers(&project.framework);
    assert!(first.is_file());
    assert!(second.is_file());
    assert!(!third.exists());
}

#[test]
fn dry_run_emits_json_and_mutates_nothing() {
    let project = project();
    let output = patchsmith(
        &project,
        &["--patch-tool", "/bin/true", "apply", "--dry-run", "--json"],
    );
    assert!(output.status.success());

    let out = stdout(&output);
    let json = &out[out.find('{').unwrap()..];
    let summary: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(summary["dry_run"], true);
    assert_eq!(summary["patches"].as_array().unwrap().len(), 3);
    assert_eq!(summary["patches"][0]["status"], "would apply");
    for marker in markers(&project.framework) {
        assert!(!marker.exists());
    }
}

#[test]
fn registry_list_preserves_registration_order() {
    let output = Command::cargo_bin("espidf-patchsmith")
        .unwrap()
        .args(["registry", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    let ds_idf = out.find("ds_idf.patch").unwrap();
    let ds_mbedtls = out.find("ds_mbedtls.patch").unwrap();
    let mlkem = out.find("mlkem_mbedtls.patch").unwrap();
    assert!(ds_idf < ds_mbedtls && ds_mbedtls < mlkem);
}

#[test]
fn registry_explain_reports_marker_name() {
    let output = Command::cargo_bin("espidf-patchsmith")
        .unwrap()
        .args(["registry", "explain", "ds_mbedtls"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains(".ds_mbedtls.patch-done"));
    assert!(out.contains("components/mbedtls/mbedtls"));

    let unknown = Command::cargo_bin("espidf-patchsmith")
        .unwrap()
        .args(["registry", "explain", "nope"])
        .output()
        .unwrap();
    assert!(!unknown.status.success());
}

#[test]
fn doctor_reports_without_mutating() {
    let project = project();
    let output = patchsmith(&project, &["--host-os", "linux", "doctor"]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["platform"], "Linux");
    assert_eq!(report["tool"], "patch");
    assert_eq!(report["patches_registered"], 3);
    assert_eq!(report["patches_dir_exists"], true);
    assert_eq!(report["framework_dir_exists"], true);
    assert_eq!(report["patches"][0]["patch_file_present"], true);
    assert_eq!(report["patches"][0]["marker_present"], false);
    for marker in markers(&project.framework) {
        assert!(!marker.exists());
    }
}

#[test]
fn apply_requires_a_framework_dir() {
    let guard = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("espidf-patchsmith")
        .unwrap()
        .arg("--project-dir")
        .arg(guard.path())
        .arg("apply")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("framework directory not configured"));
}
