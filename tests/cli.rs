mod common;

use assert_cmd::Command;
use common::{files_with_extension, read_npy, waveform_fixture};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn tdms2x() -> Command {
    Command::cargo_bin("tdms2x").unwrap()
}

#[test]
fn converts_to_npy_with_time_column() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));

    tdms2x().arg(&source).arg("-t").arg("-q").assert().success();

    let outputs = files_with_extension(dir.path(), "npy");
    assert_eq!(outputs.len(), 1);
    let name = outputs[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("dev2_1-"));

    let (header, values) = read_npy(&outputs[0]);
    assert!(header.contains("'shape': (100, 3)"));
    assert_eq!(values.len(), 300);
    assert_eq!(&values[..3], &[0.0, 0.0, 0.0]);
    assert_eq!(&values[3..6], &[0.001, 1.0, -1.0]);
    assert!((values[297] - 0.099).abs() < 1e-12);
}

#[test]
fn splits_csv_with_custom_names() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));

    tdms2x()
        .arg(&source)
        .args(["-t", "-s", "-o", "csv", "-n", "t", "volt", "amp", "-q"])
        .assert()
        .success();

    let outputs = files_with_extension(dir.path(), "csv");
    assert_eq!(outputs.len(), 3);

    for label in ["t", "volt", "amp"] {
        let suffix = format!("-{}.csv", label);
        let file = outputs
            .iter()
            .find(|p| p.to_string_lossy().ends_with(&suffix))
            .unwrap();
        let content = fs::read_to_string(file).unwrap();
        assert_eq!(content.lines().next(), Some(label));
        assert_eq!(content.lines().count(), 101);
    }
}

#[test]
fn mat_names_are_padded_from_channel_names() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));

    tdms2x()
        .arg(&source)
        .args(["-t", "-o", "mat", "-n", "t", "volt", "-q"])
        .assert()
        .success();

    let outputs = files_with_extension(dir.path(), "mat");
    assert_eq!(outputs.len(), 1);
    let bytes = fs::read(&outputs[0]).unwrap();
    assert!(bytes.starts_with(b"MATLAB 5.0 MAT-file"));
    assert!(bytes.windows(3).any(|w| w == b"ch1"));
}

#[test]
fn writes_mat_into_output_dir_with_prefix() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));
    let export = dir.path().join("export");

    tdms2x()
        .arg(&source)
        .args(["-o", "mat", "-z", "-f", "run", "-m", "-q"])
        .arg("-O")
        .arg(&export)
        .assert()
        .success();

    let outputs = files_with_extension(&export, "mat");
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("run-"));
    assert!(export.join("dev2_1.info").exists());
}

#[test]
fn display_only_prints_meta_info() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));

    tdms2x()
        .arg(&source)
        .arg("-d")
        .assert()
        .success()
        .stdout(predicate::str::contains(">>> TDMS file"))
        .stdout(predicate::str::contains("root name: dev2_1"))
        .stdout(predicate::str::contains("wf_increment"));

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn json_report_lists_outputs() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));

    tdms2x()
        .arg(&source)
        .args(["--message-format", "json", "-z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"converted\""))
        .stdout(predicate::str::contains(".npz"));
}

#[test]
fn dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));

    tdms2x()
        .arg(&source)
        .args(["--dry-run", "-s"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-ch1.npy"));

    assert!(files_with_extension(dir.path(), "npy").is_empty());
}

#[test]
fn missing_input_exits_2() {
    tdms2x()
        .arg("/definitely/not/here.tdms")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid input path"));
}

#[test]
fn empty_directory_exits_3() {
    let dir = TempDir::new().unwrap();
    tdms2x()
        .arg(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No .tdms file"));
}

#[test]
fn output_path_file_exits_4() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));
    let blocker = dir.path().join("export");
    fs::write(&blocker, b"").unwrap();

    tdms2x().arg(&source).arg("-O").arg(&blocker).assert().code(4);
}

#[test]
fn broken_file_counts_as_failure() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.tdms"), b"not a recording").unwrap();
    waveform_fixture().write(&dir.path().join("b.tdms"));

    tdms2x().arg(dir.path()).arg("-q").assert().code(1);

    assert_eq!(files_with_extension(dir.path(), "npy").len(), 1);
}

#[test]
fn out_of_range_channel_fails() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));

    tdms2x()
        .arg(&source)
        .args(["-c", "0", "5"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn generates_sample_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("tdms2x.toml");

    tdms2x()
        .arg("--generate-config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated sample configuration file"));

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[conversion]"));
    assert!(content.contains("format = \"npy\""));
}

#[test]
fn config_file_selects_format() {
    let dir = TempDir::new().unwrap();
    let source = waveform_fixture().write(&dir.path().join("dev2_1.tdms"));
    let config_path = dir.path().join("custom.toml");
    fs::write(&config_path, "[conversion]\nformat = \"csv\"\ncsv_delimiter = \",\"\n").unwrap();

    tdms2x()
        .arg(&source)
        .arg("--config")
        .arg(&config_path)
        .arg("-q")
        .assert()
        .success();

    let outputs = files_with_extension(dir.path(), "csv");
    assert_eq!(outputs.len(), 1);
    let content = fs::read_to_string(&outputs[0]).unwrap();
    assert_eq!(content.lines().next(), Some("ch0,ch1"));
}
