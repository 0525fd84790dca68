use std::path::Path;

use serde::Serialize;

use crate::cmd::BusArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    device: String,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(bus: &BusArgs, format: OutputFormat) -> CliResult<i32> {
    let mut checks = vec![device_exists_check(&bus.device)];
    if checks[0].status == CheckStatus::Pass {
        checks.push(char_device_check(&bus.device));
        checks.push(access_check(&bus.device));
    } else {
        checks.push(skipped("char_device"));
        checks.push(skipped("read_write_access"));
    }
    checks.push(link_config_check(bus));
    checks.push(compiled_features_check());

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let output = DoctorOutput {
        device: bus.device.display().to_string(),
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => crate::output::print_json(output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("spilink doctor ({})\n", output.device);
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<20} {}",
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
        OutputFormat::Raw => println!("{}", output.overall),
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn skipped(name: &'static str) -> CheckResult {
    CheckResult {
        name,
        status: CheckStatus::Skip,
        detail: "device missing".to_string(),
    }
}

fn device_exists_check(path: &Path) -> CheckResult {
    match std::fs::metadata(path) {
        Ok(_) => CheckResult {
            name: "device_exists",
            status: CheckStatus::Pass,
            detail: format!("{} present", path.display()),
        },
        Err(err) => CheckResult {
            name: "device_exists",
            status: CheckStatus::Fail,
            detail: format!("{}: {err}", path.display()),
        },
    }
}

fn char_device_check(path: &Path) -> CheckResult {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::metadata(path) {
        Ok(meta) if meta.file_type().is_char_device() => CheckResult {
            name: "char_device",
            status: CheckStatus::Pass,
            detail: "character device".to_string(),
        },
        Ok(_) => CheckResult {
            name: "char_device",
            status: CheckStatus::Fail,
            detail: "not a character device (is spidev loaded?)".to_string(),
        },
        Err(err) => CheckResult {
            name: "char_device",
            status: CheckStatus::Fail,
            detail: err.to_string(),
        },
    }
}

fn access_check(path: &Path) -> CheckResult {
    match std::fs::OpenOptions::new().read(true).write(true).open(path) {
        Ok(_) => CheckResult {
            name: "read_write_access",
            status: CheckStatus::Pass,
            detail: "opened read-write".to_string(),
        },
        Err(err) => CheckResult {
            name: "read_write_access",
            status: CheckStatus::Fail,
            detail: err.to_string(),
        },
    }
}

fn link_config_check(bus: &BusArgs) -> CheckResult {
    match bus.link_config() {
        Ok(config) => CheckResult {
            name: "link_config",
            status: CheckStatus::Info,
            detail: format!(
                "speed={}Hz ack_timeout={}ms retries={}",
                bus.speed,
                config.ack_timeout.as_millis(),
                config.max_retries
            ),
        },
        Err(err) => CheckResult {
            name: "link_config",
            status: CheckStatus::Fail,
            detail: err.message,
        },
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "handle") {
        features.push("handle");
    }
    if cfg!(feature = "cli") {
        features.push("cli");
    }

    CheckResult {
        name: "compiled_features",
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_fails() {
        let check = device_exists_check(Path::new("/nonexistent/spidev9.9"));
        assert_eq!(check.status, CheckStatus::Fail);
    }

    #[test]
    fn regular_file_is_not_a_char_device() {
        let path = std::env::temp_dir().join(format!("spilink-doctor-{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        let check = char_device_check(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(check.status, CheckStatus::Fail);
    }

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            device: "/dev/spidev0.0".to_string(),
            checks: vec![CheckResult {
                name: "x",
                status: CheckStatus::Pass,
                detail: "ok".to_string(),
            }],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
    }
}
