//! Integration tests for the CLI application
//!
//! These tests run the compiled binary against real data files.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

/// Helper to create test data files
struct TestDataFiles {
    pub libsvm_file: NamedTempFile,
    pub csv_file: NamedTempFile,
    pub test_libsvm_file: NamedTempFile,
    pub test_csv_file: NamedTempFile,
}

impl TestDataFiles {
    fn new() -> std::io::Result<Self> {
        // Three classes in LibSVM format
        let mut libsvm_file = NamedTempFile::with_suffix(".libsvm")?;
        for i in 0..6 {
            let offset = i as f64 * 0.1;
            writeln!(libsvm_file, "1 1:{} 2:{}", 1.0 + offset, 1.0 + offset)?;
            writeln!(libsvm_file, "2 1:{} 2:{}", 6.0 + offset, 1.0 + offset)?;
            writeln!(libsvm_file, "3 1:{} 2:{}", 3.0 + offset, 6.0 + offset)?;
        }
        libsvm_file.flush()?;

        // Two named classes in CSV format
        let mut csv_file = NamedTempFile::with_suffix(".csv")?;
        writeln!(csv_file, "width,height,label")?;
        writeln!(csv_file, "2.0,1.0,wide")?;
        writeln!(csv_file, "0.5,2.0,tall")?;
        writeln!(csv_file, "1.8,0.9,wide")?;
        writeln!(csv_file, "0.4,1.8,tall")?;
        writeln!(csv_file, "2.2,1.1,wide")?;
        writeln!(csv_file, "0.6,2.2,tall")?;
        csv_file.flush()?;

        let mut test_libsvm_file = NamedTempFile::with_suffix(".libsvm")?;
        writeln!(test_libsvm_file, "1 1:1.2 2:1.1")?;
        writeln!(test_libsvm_file, "2 1:6.3 2:1.2")?;
        writeln!(test_libsvm_file, "3 1:3.1 2:6.2")?;
        test_libsvm_file.flush()?;

        let mut test_csv_file = NamedTempFile::with_suffix(".csv")?;
        writeln!(test_csv_file, "width,height,label")?;
        writeln!(test_csv_file, "1.9,1.0,wide")?;
        writeln!(test_csv_file, "0.5,1.9,tall")?;
        test_csv_file.flush()?;

        Ok(TestDataFiles {
            libsvm_file,
            csv_file,
            test_libsvm_file,
            test_csv_file,
        })
    }
}

fn rsmo(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rsmo"))
        .args(args)
        .output()
        .expect("Failed to run CLI")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

fn train_model(data: &Path, dir: &TempDir, extra: &[&str]) -> PathBuf {
    let model_path = dir.path().join("model.json");
    let mut args = vec!["train", "--data", path_str(data), "--output", path_str(&model_path)];
    args.extend_from_slice(extra);

    let output = rsmo(&args);
    assert!(
        output.status.success(),
        "Train command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(model_path.exists(), "Model file was not created");
    model_path
}

#[test]
fn test_cli_train_command_libsvm() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    train_model(
        test_data.libsvm_file.path(),
        &temp_dir,
        &["--format", "libsvm", "-C", "10", "--tol", "0.001", "--cache-size", "0"],
    );
}

#[test]
fn test_cli_train_polynomial_csv() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let model_path = train_model(
        test_data.csv_file.path(),
        &temp_dir,
        &["-E", "2", "--lower-order", "--rescale", "--parallel"],
    );

    let contents = std::fs::read_to_string(model_path).unwrap();
    assert!(contents.contains("\"exponent\": 2.0"));
    assert!(contents.contains("\"created_at\""));
}

#[test]
fn test_cli_train_rejects_linear_rescale() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let output = rsmo(&[
        "train",
        "--data",
        path_str(test_data.libsvm_file.path()),
        "--output",
        path_str(&model_path),
        "--rescale",
    ]);

    assert!(!output.status.success());
    assert!(!model_path.exists());
}

#[test]
fn test_cli_rejects_unknown_option() {
    let output = rsmo(&["train", "--data", "x.libsvm", "--output", "m.json", "--gamma", "0.5"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--gamma"));
}

#[test]
fn test_cli_predict_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(test_data.libsvm_file.path(), &temp_dir, &["-C", "10"]);

    let output = rsmo(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
        "--confidence",
        "--decision-values",
    ]);
    assert!(
        output.status.success(),
        "Predict command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let rows: Vec<Vec<&str>> = stdout
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.split_whitespace().collect())
        .collect();
    assert_eq!(rows.len(), 3);
    let classes: Vec<&str> = rows.iter().map(|row| row[1]).collect();
    assert_eq!(classes, vec!["1", "2", "3"]);
    // index, class, confidence and one value per class pair
    assert!(rows.iter().all(|row| row.len() == 6));
}

#[test]
fn test_cli_predict_to_file() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(test_data.csv_file.path(), &temp_dir, &[]);
    let predictions_path = temp_dir.path().join("predictions.txt");

    let output = rsmo(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_csv_file.path()),
        "--output",
        path_str(&predictions_path),
    ]);
    assert!(output.status.success());

    let contents = std::fs::read_to_string(&predictions_path).unwrap();
    assert!(contents.contains("0 wide"));
    assert!(contents.contains("1 tall"));
}

#[test]
fn test_cli_evaluate_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(test_data.libsvm_file.path(), &temp_dir, &["-C", "10"]);

    let output = rsmo(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
        "--detailed",
    ]);
    assert!(
        output.status.success(),
        "Evaluate command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Accuracy: 100.00%"));
    assert!(stdout.contains("Confusion matrix"));
    assert!(stdout.contains("Pairwise Machines: 3"));
}

#[test]
fn test_cli_info_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(test_data.csv_file.path(), &temp_dir, &[]);

    let output = rsmo(&["info", path_str(&model_path), "--machines"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== SMO Model Summary ==="));
    assert!(stdout.contains("Kernel: linear"));
    assert!(stdout.contains("Classifier for classes: wide, tall"));
    assert!(stdout.contains("(normalized) width"));
}

#[test]
fn test_cli_missing_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let output = rsmo(&[
        "train",
        "--data",
        "/nonexistent/train.libsvm",
        "--output",
        path_str(&model_path),
    ]);
    assert!(!output.status.success());

    let output = rsmo(&["info", "/nonexistent/model.json"]);
    assert!(!output.status.success());
}
