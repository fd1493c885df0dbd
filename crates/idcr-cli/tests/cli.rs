use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn idcr() -> Command {
    Command::cargo_bin("idcr").unwrap()
}

/// Config pointing models and templates into `dir`.
fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.json");
    let config = serde_json::json!({
        "models": { "model_dir": dir.join("models") },
        "templates": { "path": dir.join("templates.json") }
    });
    fs::write(&path, config.to_string()).unwrap();
    path
}

#[test]
fn missing_file_exits_with_error() {
    idcr()
        .arg("/definitely/not/here/tnb_physical.jpg")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "The file '/definitely/not/here/tnb_physical.jpg' does not exist.",
        ));
}

#[test]
fn process_subcommand_reports_missing_file_too() {
    idcr()
        .args(["process", "/definitely/not/here/TM.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn help_lists_subcommands() {
    idcr()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("models"));
}

#[test]
fn unsupported_file_prints_empty_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let input = dir.path().join("notes.txt");
    fs::write(&input, "hello").unwrap();

    idcr()
        .arg("-c")
        .arg(&config)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::diff("{}\n"));
}

#[test]
fn image_without_models_fails_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let input = dir.path().join("tnb_physical.jpg");
    fs::write(&input, b"not really a jpeg").unwrap();

    idcr()
        .arg("-c")
        .arg(&config)
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("OCR models not found"))
        .stderr(predicate::str::contains("idcr models download"));
}

#[test]
fn config_show_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("absent.json");

    idcr()
        .arg("-c")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"month_score_cutoff\": 60"))
        .stdout(predicate::str::contains("tnb-online"));
}

#[test]
fn config_init_set_get_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nested").join("config.json");

    idcr()
        .arg("-c")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    idcr()
        .arg("-c")
        .arg(&config)
        .args(["config", "set", "extraction.date_error_policy", "skip"])
        .assert()
        .success();

    idcr()
        .arg("-c")
        .arg(&config)
        .args(["config", "get", "extraction.date_error_policy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"skip\""));

    idcr()
        .arg("-c")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn models_status_lists_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    idcr()
        .arg("-c")
        .arg(&config)
        .args(["models", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("det.onnx (missing)"))
        .stdout(predicate::str::contains("latin_dict.txt (missing)"));
}

#[test]
fn batch_without_matches_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let pattern = format!("{}/*.jpg", dir.path().display());

    idcr()
        .arg("-c")
        .arg(&config)
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}
