//! Integration tests for the `extpack` binary.
//!
//! Only paths that need neither cargo nor network access are exercised: CI
//! packaging of a prebuilt artifact, failure reporting, and archive listing.

#![allow(non_snake_case)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn extpack(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_extpack"))
        .args(args)
        .env_remove("EXTPACK_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Project tree with a prebuilt Linux CI artifact.
fn create_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for name in ["package.json", "LICENSE", "README.md"] {
        fs::write(root.join(name), name).unwrap();
    }
    fs::create_dir_all(root.join("scripts")).unwrap();
    fs::write(root.join("scripts/main.lua"), b"print('main')").unwrap();
    fs::create_dir_all(root.join("lib/target/linux-gnu/release")).unwrap();
    fs::write(root.join("lib/target/linux-gnu/release/libdmi.so"), b"ELF").unwrap();
    dir
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// =============================================================================
// build
// =============================================================================

mod build {
    use super::*;

    #[test]
    fn build___ci_prebuilt_artifact___succeeds_and_reports() {
        let project = create_project();
        let root = path_arg(project.path());

        let output = extpack(&["build", "--path", &root, "--ci", "linux-gnu"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("Build completed successfully."));
        assert!(project.path().join("dist/aseprite-dmi-linux.zip").is_file());
        assert!(
            project
                .path()
                .join("dist/aseprite-dmi-linux.aseprite-extension")
                .is_file()
        );
        assert!(project.path().join("dist/unzipped/libdmi.so").is_file());
    }

    #[test]
    fn build___ci_without_tag___fails_with_target_error() {
        let project = create_project();
        let root = path_arg(project.path());

        let output = extpack(&["build", "--path", &root, "--ci"]);

        assert!(!output.status.success());
        assert!(stderr(&output).contains("target resolution"));
        assert!(!project.path().join("dist").exists());
    }

    #[test]
    fn build___ci_missing_artifact___fails_and_leaves_no_output() {
        let project = create_project();
        let root = path_arg(project.path());

        let output = extpack(&["build", "--path", &root, "--ci", "windows-msvc"]);

        assert!(!output.status.success());
        assert!(stderr(&output).contains("artifact lookup"));
        assert!(!stdout(&output).contains("Build completed successfully."));
        assert!(!project.path().join("dist").exists());
    }

    #[test]
    fn build___missing_project___fails() {
        let temp_dir = TempDir::new().unwrap();
        let root = path_arg(&temp_dir.path().join("missing"));

        let output = extpack(&["build", "--path", &root]);

        assert!(!output.status.success());
        assert!(stderr(&output).contains("Project directory not found"));
    }
}

// =============================================================================
// list
// =============================================================================

mod list {
    use super::*;

    #[test]
    fn list___built_archive___prints_entries() {
        let project = create_project();
        let root = path_arg(project.path());
        let build = extpack(&["build", "--path", &root, "--ci", "linux-gnu"]);
        assert!(build.status.success(), "stderr: {}", stderr(&build));
        let archive = path_arg(&project.path().join("dist/aseprite-dmi-linux.zip"));

        let output = extpack(&["list", &archive]);

        assert!(output.status.success());
        let text = stdout(&output);
        assert!(text.contains("libdmi.so"));
        assert!(text.contains("scripts/main.lua"));
        assert!(text.contains("5 files"));
    }

    #[test]
    fn list___not_an_archive___fails() {
        let temp_dir = TempDir::new().unwrap();
        let bogus = temp_dir.path().join("bogus.zip");
        fs::write(&bogus, b"not a zip").unwrap();

        let output = extpack(&["list", &path_arg(&bogus)]);

        assert!(!output.status.success());
        assert!(stderr(&output).contains("Failed to open"));
    }
}
