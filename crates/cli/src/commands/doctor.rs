use freightprint_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_estimator_key(&config));
            checks.push(check_supplier_data(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "estimator_key_readiness",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "supplier_data",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_ok = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_ok { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_ok {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_estimator_key(config: &AppConfig) -> DoctorCheck {
    if config.estimator.api_key.expose_secret().trim().is_empty() {
        DoctorCheck {
            name: "estimator_key_readiness",
            status: CheckStatus::Fail,
            details: "estimator api key is empty; only fallback estimates will be available"
                .to_string(),
        }
    } else {
        DoctorCheck {
            name: "estimator_key_readiness",
            status: CheckStatus::Pass,
            details: "estimator api key present".to_string(),
        }
    }
}

fn check_supplier_data(config: &AppConfig) -> DoctorCheck {
    match &config.suppliers.data_path {
        None => DoctorCheck {
            name: "supplier_data",
            status: CheckStatus::Skipped,
            details: "no supplier data configured; supplier search will return no matches"
                .to_string(),
        },
        Some(path) if path.exists() => DoctorCheck {
            name: "supplier_data",
            status: CheckStatus::Pass,
            details: format!("supplier data found at `{}`", path.display()),
        },
        Some(path) => DoctorCheck {
            name: "supplier_data",
            status: CheckStatus::Fail,
            details: format!("supplier data not found at `{}`", path.display()),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
