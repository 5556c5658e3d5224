use billpack_core::config::AppConfig;
use billpack_render::{build_backends, RenderEnvironment};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: impl Into<String>, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name: name.into(), status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(loaded: Result<AppConfig, String>, json_output: bool) -> String {
    let report = build_report(loaded);

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

fn build_report(loaded: Result<AppConfig, String>) -> DoctorReport {
    let mut checks = Vec::new();

    match loaded {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_template_environment(&config));
            checks.extend(check_backends(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error));
            for name in ["template_environment", "backend_chain"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: ready to generate documents".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_template_environment(config: &AppConfig) -> DoctorCheck {
    match RenderEnvironment::new(config.render.clone()) {
        Ok(_) => DoctorCheck::new(
            "template_environment",
            CheckStatus::Pass,
            "document template compiled",
        ),
        Err(error) => {
            DoctorCheck::new("template_environment", CheckStatus::Fail, error.to_string())
        }
    }
}

/// One check per configured backend, in attempt order, then one for the
/// chain as a whole. A missing converter only degrades the chain.
fn check_backends(config: &AppConfig) -> Vec<DoctorCheck> {
    let backends = build_backends(&config.render);
    let mut checks: Vec<DoctorCheck> = backends
        .iter()
        .enumerate()
        .map(|(index, backend)| {
            let name = format!("backend.{}", backend.id());
            if backend.is_available() {
                DoctorCheck::new(
                    name,
                    CheckStatus::Pass,
                    format!("attempt {} produces {:?} output", index + 1, backend.format()),
                )
            } else {
                DoctorCheck::new(
                    name,
                    CheckStatus::Warn,
                    "executable not found; attempts will fall through to the next backend",
                )
            }
        })
        .collect();

    let available = backends.iter().filter(|backend| backend.is_available()).count();
    checks.push(if available > 0 {
        DoctorCheck::new(
            "backend_chain",
            CheckStatus::Pass,
            format!("{available} of {} configured backends can run", backends.len()),
        )
    } else {
        DoctorCheck::new(
            "backend_chain",
            CheckStatus::Fail,
            "no configured backend can run; every document would be an error document",
        )
    });
    checks
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
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
