//! Integration tests for the `pharmatrain train` and `pharmatrain jobs` commands.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const JOBS: [(&str, &str, &str); 3] = [
    ("train_drug_classifier.py", "drug_classifier_config.json", "echo \"epoch 1/1\"\nexit 0\n"),
    (
        "train_authenticity_verifier.py",
        "authenticity_config.json",
        "echo \"diverged\" >&2\nexit 1\n",
    ),
    ("train_pill_detector.py", "pill_detection_config.json", "echo \"done\"\n"),
];

fn pharmatrain(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pharmatrain").unwrap();
    cmd.current_dir(project).env("HOME", project);
    cmd
}

/// Lay out a project whose job scripts are shell scripts run with `sh`.
fn init_project(temp_dir: &TempDir) {
    let root = temp_dir.path();
    fs::create_dir_all(root.join("training/scripts")).unwrap();
    fs::create_dir_all(root.join("training/configs")).unwrap();
    fs::create_dir_all(root.join("data/pharmaceutical_images/authentic")).unwrap();
    fs::create_dir_all(root.join("data/pharmaceutical_images/counterfeit")).unwrap();
    for (script, config, body) in JOBS {
        fs::write(root.join("training/scripts").join(script), body).unwrap();
        fs::write(root.join("training/configs").join(config), "{}").unwrap();
    }
    fs::write(root.join("pharmatrain.toml"), "interpreter = \"sh\"\n").unwrap();
}

fn reports(root: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(root.join("training"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with("training_report_"))
        .collect()
}

#[test]
fn test_jobs_lists_registry() {
    let temp_dir = TempDir::new().unwrap();

    pharmatrain(temp_dir.path())
        .arg("jobs")
        .assert()
        .success()
        .stdout(predicate::str::contains("drug_classifier"))
        .stdout(predicate::str::contains("authenticity_verifier"))
        .stdout(predicate::str::contains("pill_detector"));
}

#[test]
fn test_jobs_json() {
    let temp_dir = TempDir::new().unwrap();

    let output = pharmatrain(temp_dir.path()).arg("jobs").arg("--json").output().unwrap();
    assert!(output.status.success());
    let jobs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(jobs.as_array().unwrap().len(), 3);
    assert_eq!(jobs[0]["name"], "drug_classifier");
}

#[test]
fn test_train_missing_prerequisites_starts_nothing() {
    let temp_dir = TempDir::new().unwrap();

    pharmatrain(temp_dir.path())
        .arg("train")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Prerequisites check failed"));

    assert!(!temp_dir.path().join("models").exists());
}

#[test]
fn test_train_failed_job_gives_nonzero_exit() {
    let temp_dir = TempDir::new().unwrap();
    init_project(&temp_dir);

    pharmatrain(temp_dir.path())
        .arg("train")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[drug_classifier] epoch 1/1"))
        .stdout(predicate::str::contains("AUTHENTICITY_VERIFIER: FAILED"))
        .stdout(predicate::str::contains("PILL_DETECTOR: COMPLETED"));

    let reports = reports(temp_dir.path());
    assert_eq!(reports.len(), 1);
    let contents = fs::read_to_string(&reports[0]).unwrap();
    let report: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(report["summary"]["completed"], 2);
    assert_eq!(report["summary"]["failed"], 1);
    assert_eq!(report["models"]["authenticity_verifier"]["error"], "Process exited with code 1");

    let log = temp_dir
        .path()
        .join("models/authenticity_verifier/authenticity_verifier_training.log");
    assert!(fs::read_to_string(log).unwrap().contains(" - diverged"));
}

#[test]
fn test_train_selected_models_json() {
    let temp_dir = TempDir::new().unwrap();
    init_project(&temp_dir);

    let output = pharmatrain(temp_dir.path())
        .args(["train", "--models", "pill_detector", "drug_classifier", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let out: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(out["completed"], serde_json::json!(["pill_detector", "drug_classifier"]));
    assert_eq!(out["report"]["models"]["authenticity_verifier"]["status"], "pending");
    assert_eq!(out["report"]["summary"]["pending"], 1);
}

#[test]
fn test_train_unknown_model_fails() {
    let temp_dir = TempDir::new().unwrap();
    init_project(&temp_dir);

    pharmatrain(temp_dir.path())
        .args(["train", "--models", "label_reader"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed:"));
}

#[test]
fn test_train_timeout_from_flag() {
    let temp_dir = TempDir::new().unwrap();
    init_project(&temp_dir);
    let script = temp_dir.path().join("training/scripts/train_pill_detector.py");
    fs::write(script, "sleep 30\n").unwrap();

    pharmatrain(temp_dir.path())
        .args(["train", "--models", "pill_detector", "--timeout-secs", "1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Timed out after 1s"));
}
