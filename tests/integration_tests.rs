use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Test utilities for driving the binary
mod test_utils {
    use super::*;

    pub fn seamcut() -> Command {
        let mut cmd = Command::cargo_bin("seamcut").unwrap();
        // Keep the user's environment out of the tests
        for key in [
            "SEAMCUT_FFMPEG",
            "SEAMCUT_FFPROBE",
            "SEAMCUT_LOG_LEVEL",
            "SEAMCUT_LOG_JSON",
            "SEAMCUT_OVERWRITE",
            "SEAMCUT_SMART_CUT",
            "SEAMCUT_KEYFRAME_CUT",
            "SEAMCUT_KEYFRAME_WINDOW",
        ] {
            cmd.env_remove(key);
        }
        cmd
    }

    /// A file that exists but is not media
    pub fn create_dummy_input(dir: &TempDir) -> String {
        let path = dir.path().join("input.mp4");
        std::fs::write(&path, b"not really a video").unwrap();
        path.to_string_lossy().into_owned()
    }
}

use test_utils::*;

#[test]
fn test_help_lists_commands() {
    seamcut()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cut"))
        .stdout(predicate::str::contains("concat"))
        .stdout(predicate::str::contains("keyframes"))
        .stdout(predicate::str::contains("detect"));
}

#[test]
fn test_version() {
    seamcut()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("seamcut"));
}

#[test]
fn test_cut_missing_input_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.mp4");

    seamcut()
        .current_dir(temp_dir.path())
        .args(["cut", &missing.to_string_lossy(), "--segment", "1-2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file does not exist"));
}

#[test]
fn test_cut_reports_missing_probe_tool() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_dummy_input(&temp_dir);

    seamcut()
        .current_dir(temp_dir.path())
        .args([
            "--ffprobe",
            "seamcut-test-no-such-ffprobe",
            "cut",
            &input,
            "--segment",
            "1-2",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to probe input file"));
}

#[test]
fn test_project_conflicts_with_segments() {
    seamcut()
        .args([
            "cut",
            "input.mp4",
            "--segment",
            "1-2",
            "--project",
            "edit.json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_detect_rejects_unknown_kind() {
    seamcut()
        .args(["detect", "input.mp4", "--kind", "noise"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("noise"));
}

#[test]
fn test_concat_requires_files() {
    seamcut()
        .args(["concat", "-o", "joined.mp4"])
        .assert()
        .failure();
}

#[test]
fn test_missing_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_dummy_input(&temp_dir);
    let config = temp_dir.path().join("absent.toml");

    seamcut()
        .current_dir(temp_dir.path())
        .args([
            "--config",
            &config.to_string_lossy(),
            "cut",
            &input,
            "--segment",
            "1-2",
        ])
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_dummy_input(&temp_dir);
    let config = temp_dir.path().join("seamcut.toml");
    std::fs::write(&config, "[keyframes]\nwindow = \"wide\"\n").unwrap();

    seamcut()
        .current_dir(temp_dir.path())
        .args([
            "--config",
            &config.to_string_lossy(),
            "cut",
            &input,
            "--segment",
            "1-2",
        ])
        .assert()
        .failure();
}
