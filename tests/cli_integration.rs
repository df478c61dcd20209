//! Integration tests for the command-line interface
//!
//! Runs the built binary against a copy of `tests/fixtures`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Copy the fixture project into a temp dir.
fn setup_test_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let source = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    for entry in WalkDir::new(&source) {
        let entry = entry.unwrap();
        let target = dir.path().join(entry.path().strip_prefix(&source).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
    dir
}

fn beacon(args: &[&str], project: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_beacon-patcher"))
        .args(args)
        .arg("--project")
        .arg(project)
        .env("NO_COLOR", "1")
        .env_remove("BEACON_PROJECT")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_apply_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_beacon-patcher"))
        .args(["apply", "--help"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let help = stdout(&output);
    assert!(help.contains("--dry-run"));
    assert!(help.contains("--project"));
    assert!(help.contains("--config"));
}

#[test]
fn test_apply_basic() {
    let project = setup_test_project();
    let output = beacon(&["apply"], project.path());

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("ios-pod: Applied to ios/Podfile"));
    assert!(out.contains("android-main-application: Applied to android/app/src/main/java/com/demo/MainApplication.java"));
    assert!(out.contains("Summary:"));

    let podfile = fs::read_to_string(project.path().join("ios/Podfile")).unwrap();
    assert!(podfile.contains("pod 'BeaconSDK'"));
}

#[test]
fn test_apply_idempotent() {
    let project = setup_test_project();
    assert!(beacon(&["apply"], project.path()).status.success());

    let output = beacon(&["apply"], project.path());
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("ios-pod: Already applied to ios/Podfile"));
    assert!(!out.contains(": Applied to"));
}

#[test]
fn test_apply_dry_run_with_diff() {
    let project = setup_test_project();
    let podfile = project.path().join("ios/Podfile");
    let original = fs::read_to_string(&podfile).unwrap();

    let output = beacon(&["apply", "--dry-run", "--diff"], project.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("DRY RUN"));
    assert!(out.contains("ios-pod: Would apply to ios/Podfile"));
    assert!(out.contains("+++ ios/Podfile (patched)"));
    assert!(out.contains("+  pod 'BeaconSDK'"));

    assert_eq!(fs::read_to_string(&podfile).unwrap(), original);
    assert!(!project.path().join("ios/Beacon").exists());
}

#[test]
fn test_status_command() {
    let project = setup_test_project();

    let before = stdout(&beacon(&["status"], project.path()));
    assert!(before.contains("Patch Status Report"));
    assert!(before.contains("PENDING (8 steps)"));

    beacon(&["apply"], project.path());
    let after = stdout(&beacon(&["status"], project.path()));
    assert!(after.contains("APPLIED (8 steps)"));
    assert!(!after.contains("PENDING"));
}

#[test]
fn test_verify_command() {
    let project = setup_test_project();

    let output = beacon(&["verify"], project.path());
    assert!(!output.status.success());
    assert!(stderr(&output).contains("MISMATCH"));

    beacon(&["apply"], project.path());

    let output = beacon(&["verify"], project.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("ios-pod: Verified (already applied)"));
}

#[test]
fn test_show_config_masks_password() {
    let project = setup_test_project();
    let output = beacon(&["show-config"], project.path());

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("subscription:          acme"));
    assert!(out.contains("username:              a"));
    assert!(out.contains("password:              ********"));
    assert!(!out.contains("password:              b"));
}

#[test]
fn test_invalid_config_fails_before_patching() {
    let project = setup_test_project();
    fs::write(
        project.path().join("beacon.toml"),
        "[plugin]\nsubscription = \"acme\"\nusername = \"a\"\n",
    )
    .unwrap();
    let podfile = project.path().join("ios/Podfile");
    let original = fs::read_to_string(&podfile).unwrap();

    let output = beacon(&["apply"], project.path());
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("uid"));
    assert!(err.contains("password"));
    assert_eq!(fs::read_to_string(&podfile).unwrap(), original);
}

#[test]
fn test_explicit_config_flag() {
    let project = setup_test_project();
    fs::remove_file(project.path().join("beacon.toml")).unwrap();
    let config = project.path().join("app.json");
    fs::write(
        &config,
        r#"{"expo": {"plugins": [["beacon-sdk", {"subscription": "json-sub", "uid": "u9"}]]}}"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_beacon-patcher"))
        .args(["show-config", "--project"])
        .arg(project.path())
        .arg("--config")
        .arg(&config)
        .env("NO_COLOR", "1")
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("subscription:          json-sub"));
}

#[test]
fn test_missing_project() {
    let dir = TempDir::new().unwrap();
    let output = beacon(&["apply"], &dir.path().join("nowhere"));

    assert!(!output.status.success());
    assert!(stderr(&output).contains("does not exist"));
}
