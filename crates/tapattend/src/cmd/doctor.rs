use std::path::Path;

use serde::Serialize;
use tapattend_session::RosterError;

use crate::backend;
use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;
use crate::roster::load_roster;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        compiled_features_check(),
        reader_check(&args.reader),
        ledger_dir_check(&args.dir),
        roster_check(args.roster.as_deref()),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    print_doctor(&DoctorOutput { checks, overall }, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("tapattend doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "pcsc") {
        features.push("pcsc");
    }
    CheckResult::new("compiled_features", CheckStatus::Info, features.join(", "))
}

fn reader_check(args: &backend::ReaderArgs) -> CheckResult {
    if let Some(path) = &args.sim_image {
        return if path.is_file() {
            CheckResult::new(
                "reader",
                CheckStatus::Pass,
                format!("tag image {}", path.display()),
            )
        } else {
            CheckResult::new(
                "reader",
                CheckStatus::Warn,
                format!("tag image {} missing (reads as no tag)", path.display()),
            )
        };
    }

    match backend::list_readers(args) {
        Ok(names) if names.is_empty() => {
            CheckResult::new("reader", CheckStatus::Fail, "no readers connected")
        }
        Ok(names) => CheckResult::new("reader", CheckStatus::Pass, names.join(", ")),
        Err(err) => CheckResult::new("reader", CheckStatus::Fail, err.message),
    }
}

fn ledger_dir_check(dir: &Path) -> CheckResult {
    let scratch = dir.join(format!(".tapattend-doctor-{}", std::process::id()));
    let result = std::fs::write(&scratch, b"scratch");
    let _ = std::fs::remove_file(&scratch);

    match result {
        Ok(()) => CheckResult::new(
            "ledger_dir",
            CheckStatus::Pass,
            format!("{} is writable", dir.display()),
        ),
        Err(err) => CheckResult::new(
            "ledger_dir",
            CheckStatus::Fail,
            format!("{} is not writable: {err}", dir.display()),
        ),
    }
}

fn roster_check(path: Option<&Path>) -> CheckResult {
    let Some(path) = path else {
        return CheckResult::new("roster", CheckStatus::Skip, "no roster given");
    };
    match load_roster(path) {
        Ok(roster) => {
            let incomplete = roster
                .rows()
                .filter(|(row, data)| {
                    matches!(data.to_profile(*row), Err(RosterError::Incomplete { .. }))
                })
                .count();
            let rows = roster.rows().count();
            if incomplete == 0 {
                CheckResult::new("roster", CheckStatus::Pass, format!("{rows} rows"))
            } else {
                CheckResult::new(
                    "roster",
                    CheckStatus::Warn,
                    format!("{rows} rows, {incomplete} incomplete"),
                )
            }
        }
        Err(err) => CheckResult::new("roster", CheckStatus::Fail, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            checks: vec![CheckResult::new("x", CheckStatus::Pass, "ok")],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"status\":\"pass\""));
    }

    #[test]
    fn unwritable_ledger_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let check = ledger_dir_check(&dir.path().join("missing"));
        assert!(matches!(check.status, CheckStatus::Fail));
    }

    #[test]
    fn roster_with_short_row_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        std::fs::write(&path, "First Name,Last Name,CIN,Major\nAda,L,1,Math\nGrace,,,\n").unwrap();
        let check = roster_check(Some(&path));
        assert!(matches!(check.status, CheckStatus::Warn));
        assert_eq!(check.detail, "2 rows, 1 incomplete");
    }
}
