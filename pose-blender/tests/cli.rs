//! CLI integration tests
//!
//! These run the real binary against the face rig fixture and check the
//! printed output.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn pose_blender() -> Command {
    Command::cargo_bin("pose-blender").unwrap()
}

fn blend_json(extra: &[&str]) -> Value {
    let output = pose_blender()
        .arg("blend")
        .arg(fixture("face_rig.json"))
        .args(["--format", "json"])
        .args(extra)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

fn component(value: &Value, bone: &str, field: &str, index: usize) -> f64 {
    value[bone][field][index].as_f64().unwrap()
}

#[test]
fn test_inspect_lists_poses_and_warnings() {
    pose_blender()
        .arg("inspect")
        .arg(fixture("face_rig.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Armature: face"))
        .stdout(predicate::str::contains("Base pose: base_pose"))
        .stdout(predicate::str::contains("Relevant bones (3):"))
        .stdout(predicate::str::contains("smile.R"))
        .stdout(predicate::str::contains(
            "Unsupported channel 'rotation_axis_angle' on bone 'lip.R'",
        ));
}

#[test]
fn test_inspect_override_mode() {
    pose_blender()
        .args(["inspect", "--override"])
        .arg(fixture("face_rig.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Mode: override"));
}

#[test]
fn test_blend_set_weight() {
    let bones = blend_json(&["--set", "open=1"]);

    assert!((component(&bones, "jaw", "location", 1) + 1.0).abs() < 1e-5);
    // 45 degrees about X, serialized as x, y, z, w
    assert!((component(&bones, "jaw", "rotation", 0) - 0.382_683).abs() < 1e-4);
    assert!((component(&bones, "jaw", "rotation", 3) - 0.923_879).abs() < 1e-4);
    assert!(component(&bones, "lip.L", "location", 0).abs() < 1e-6);
    assert!(bones.get("head").is_none());
}

#[test]
fn test_blend_weights_file() {
    let dir = TempDir::new().unwrap();
    let weights = dir.path().join("weights.json");
    fs::write(&weights, r#"{"smile.L": 0.5, "bogus": 1.0}"#).unwrap();

    let bones = blend_json(&["--weights", weights.to_str().unwrap(), "--set", "smile.R=1"]);
    assert!((component(&bones, "lip.L", "location", 0) - 0.5).abs() < 1e-6);
    assert!((component(&bones, "lip.R", "location", 0) + 1.0).abs() < 1e-6);
}

#[test]
fn test_blend_override() {
    let bones = blend_json(&["--override", "--set", "smile.L=1", "--set", "open=0"]);
    assert!((component(&bones, "lip.L", "location", 0) - 1.0).abs() < 1e-6);
    assert!(component(&bones, "jaw", "location", 1).abs() < 1e-6);
}

#[test]
fn test_blend_override_weights_file_then_set() {
    let dir = TempDir::new().unwrap();
    let weights = dir.path().join("weights.json");
    fs::write(&weights, r#"{"smile.L": 0.5}"#).unwrap();

    // Two weight sources mean two updates; the second must not blend on top of the first
    let bones = blend_json(&[
        "--override",
        "--weights",
        weights.to_str().unwrap(),
        "--set",
        "open=0",
    ]);
    assert!((component(&bones, "lip.L", "location", 0) - 0.5).abs() < 1e-6);
}

#[test]
fn test_blend_table() {
    pose_blender()
        .arg("blend")
        .arg(fixture("face_rig.json"))
        .args(["--set", "smile.L=1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rotation (wxyz)"))
        .stdout(predicate::str::contains("(1.000, 0.000, 0.000)"));
}

#[test]
fn test_blend_malformed_weights_file() {
    let dir = TempDir::new().unwrap();
    let weights = dir.path().join("weights.json");
    fs::write(&weights, "[1, 2, 3]").unwrap();

    pose_blender()
        .arg("blend")
        .arg(fixture("face_rig.json"))
        .arg("--weights")
        .arg(&weights)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed input"));
}

#[test]
fn test_blend_bad_set_argument() {
    pose_blender()
        .arg("blend")
        .arg(fixture("face_rig.json"))
        .args(["--set", "open"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));
}

#[test]
fn test_missing_rig_file() {
    pose_blender()
        .args(["inspect", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read rig file"));
}

#[test]
fn test_rig_without_pose_library() {
    let dir = TempDir::new().unwrap();
    let rig = dir.path().join("bare.json");
    fs::write(&rig, r#"{"name": "bare", "bones": {"root": {}}}"#).unwrap();

    pose_blender()
        .arg("blend")
        .arg(&rig)
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no pose library"));
}

#[test]
fn test_flip_name() {
    pose_blender()
        .args(["flip-name", "arm.L", "brow", "r_cheek"])
        .assert()
        .success()
        .stdout("arm.R\nl_cheek\n");
}

#[test]
fn test_completions() {
    pose_blender()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pose-blender"));
}
