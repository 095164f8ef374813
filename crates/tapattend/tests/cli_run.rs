#![cfg(feature = "cli")]

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const ROSTER: &str = "First Name,Last Name,CIN,Major
Ada,Lovelace,305123456,Mathematics
";

fn tapattend() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tapattend"));
    for var in [
        "TAPATTEND_LEDGER",
        "TAPATTEND_ROSTER",
        "TAPATTEND_SIM_IMAGE",
        "TAPATTEND_READER",
    ] {
        cmd.env_remove(var);
    }
    cmd.args(["--log-level", "error", "--format", "json"]);
    cmd
}

fn events(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each stdout line is a json event"))
        .collect()
}

fn statuses(events: &[serde_json::Value]) -> Vec<String> {
    events
        .iter()
        .filter(|e| e["kind"] == "status")
        .filter_map(|e| e["data"]["status"].as_str().map(str::to_string))
        .collect()
}

fn logged(events: &[serde_json::Value]) -> usize {
    events.iter().filter(|e| e["kind"] == "logged").count()
}

fn provision(dir: &Path, image: &Path) {
    let roster = dir.join("roster.csv");
    std::fs::write(&roster, ROSTER).unwrap();
    std::fs::write(image, vec![0u8; 256]).unwrap();
    let status = tapattend()
        .args(["provision", "2", "--roster"])
        .arg(&roster)
        .arg("--sim-image")
        .arg(image)
        .status()
        .expect("provision runs");
    assert!(status.success());
}

fn run_cycles(image: &Path, ledger: &Path, cycles: u32) -> Output {
    tapattend()
        .args(["run", "--interval", "10ms", "--max-cycles"])
        .arg(cycles.to_string())
        .arg("--sim-image")
        .arg(image)
        .arg("--ledger")
        .arg(ledger)
        .stdin(Stdio::null())
        .output()
        .expect("run starts")
}

#[test]
fn run_logs_tag_once_and_not_again_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("tag.bin");
    let ledger = dir.path().join("logs").join("ledger.csv");
    provision(dir.path(), &image);

    let output = run_cycles(&image, &ledger, 5);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let first = events(&output);
    assert_eq!(logged(&first), 1);
    assert!(!first.iter().any(|e| e["kind"] == "restored"));
    assert_eq!(statuses(&first).first().map(String::as_str), Some("reader_ready"));
    assert_eq!(statuses(&first).last().map(String::as_str), Some("stopped"));

    let text = std::fs::read_to_string(&ledger).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Student CIN,First Name,Last Name,Major,Timestamp");
    assert!(lines[1].starts_with("305123456,Ada,Lovelace,Mathematics,"));

    let output = run_cycles(&image, &ledger, 5);
    assert!(output.status.success());
    let second = events(&output);
    assert_eq!(logged(&second), 0);
    assert_eq!(second[0]["kind"], "restored");
    assert_eq!(second[0]["data"]["identifier"], "305123456");
    assert_eq!(second[1]["data"]["status"], "reader_ready");
    let already: Vec<_> = statuses(&second)
        .into_iter()
        .filter(|s| s == "already_signed_in")
        .collect();
    assert_eq!(already.len(), 1);
    assert_eq!(std::fs::read_to_string(&ledger).unwrap().lines().count(), 2);
}

#[test]
fn run_without_tag_waits_quietly() {
    let dir = tempfile::tempdir().unwrap();
    let output = tapattend()
        .args(["run", "--interval", "5ms", "--max-cycles", "6", "--event", "Fair", "--dir"])
        .arg(dir.path())
        .arg("--sim-image")
        .arg(dir.path().join("absent.bin"))
        .stdin(Stdio::null())
        .output()
        .expect("run starts");
    assert!(output.status.success());

    let statuses = statuses(&events(&output));
    assert_eq!(statuses, vec!["reader_ready", "waiting_for_tag", "stopped"]);
    assert!(dir.path().join("Fair_attendance.csv").is_file());
}

#[test]
fn run_provisions_from_stdin_then_logs() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.csv");
    std::fs::write(&roster, ROSTER).unwrap();
    let image = dir.path().join("tag.bin");
    std::fs::write(&image, vec![0u8; 256]).unwrap();
    let ledger = dir.path().join("ledger.csv");

    let mut child = tapattend()
        .args(["run", "--interval", "10ms", "--max-cycles", "200", "--roster"])
        .arg(&roster)
        .arg("--sim-image")
        .arg(&image)
        .arg("--ledger")
        .arg(&ledger)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("run starts");
    {
        let mut stdin = child.stdin.take().expect("stdin is piped");
        stdin.write_all(b"provision 2\n").unwrap();
    }
    let output = child.wait_with_output().expect("run finishes");
    assert!(output.status.success());

    let all = events(&output);
    let statuses = statuses(&all);
    assert!(statuses.iter().any(|s| s == "provisioned"));
    assert_eq!(logged(&all), 1);
    assert_eq!(std::fs::read_to_string(&ledger).unwrap().lines().count(), 2);
}

#[test]
fn run_without_ledger_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = tapattend()
        .args(["run", "--max-cycles", "1", "--sim-image"])
        .arg(dir.path().join("tag.bin"))
        .stdin(Stdio::null())
        .output()
        .expect("run starts");
    assert_eq!(output.status.code(), Some(64));
}
