use std::path::Path;

use billpack_core::config::AppConfig;
use billpack_core::domain::deviation::DeviationTotals;
use billpack_core::domain::meta::PROJECT_NAME;
use billpack_core::domain::summary::FinancialSummary;
use billpack_core::ingest::IngestReport;
use billpack_render::Orchestrator;
use serde::Serialize;

use crate::commands::{block_on, read_input, run_failure, CommandResult, EXIT_RUNTIME};

#[derive(Debug, Serialize)]
struct SummaryReport {
    command: &'static str,
    status: &'static str,
    input: String,
    input_sha256: String,
    project_name: String,
    summary: FinancialSummary,
    deviation: DeviationTotals,
    ingest: IngestReport,
}

pub fn run(config: &AppConfig, input: &Path) -> CommandResult {
    let bytes = match read_input("summary", input) {
        Ok(bytes) => bytes,
        Err(result) => return result,
    };
    let orchestrator = match Orchestrator::new(config) {
        Ok(orchestrator) => orchestrator,
        Err(error) => {
            return CommandResult::failure("summary", "environment", error.to_string(), EXIT_RUNTIME);
        }
    };

    let analysis = match block_on("summary", orchestrator.analyze(bytes)) {
        Ok(Ok(analysis)) => analysis,
        Ok(Err(error)) => return run_failure("summary", &error),
        Err(result) => return result,
    };

    let report = SummaryReport {
        command: "summary",
        status: "ok",
        input: input.display().to_string(),
        input_sha256: analysis.input_sha256,
        project_name: analysis.model.meta.text(PROJECT_NAME).to_string(),
        summary: analysis.summary,
        deviation: analysis.deviation.totals,
        ingest: analysis.report,
    };
    CommandResult::report(&report, 0)
}
