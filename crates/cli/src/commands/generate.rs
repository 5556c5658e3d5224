use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use billpack_core::config::AppConfig;
use billpack_render::{Orchestrator, RunInput, RunOutput};
use serde::Serialize;

use crate::commands::{
    block_on, read_input, run_failure, CommandResult, EXIT_DEGRADED, EXIT_OUTPUT, EXIT_RUNTIME,
};

#[derive(Debug, Serialize)]
struct DocumentLine {
    document: String,
    backend: String,
    size_bytes: usize,
    succeeded: bool,
    attempts: usize,
    file: String,
}

#[derive(Debug, Serialize)]
struct GenerateReport {
    command: &'static str,
    status: &'static str,
    run_id: String,
    input_sha256: String,
    out_dir: String,
    net_payable: String,
    documents: Vec<DocumentLine>,
}

pub fn run(config: &AppConfig, input: &Path, out_dir: &Path) -> CommandResult {
    let bytes = match read_input("generate", input) {
        Ok(bytes) => bytes,
        Err(result) => return result,
    };
    let orchestrator = match Orchestrator::new(config) {
        Ok(orchestrator) => orchestrator,
        Err(error) => {
            return CommandResult::failure(
                "generate",
                "environment",
                error.to_string(),
                EXIT_RUNTIME,
            );
        }
    };

    let mut run_input = RunInput::new(bytes);
    if let Some(name) = input.file_name() {
        run_input = run_input.with_filename(name.to_string_lossy());
    }

    let output = match block_on("generate", orchestrator.run_until(run_input, shutdown_signal())) {
        Ok(Ok(output)) => output,
        Ok(Err(error)) => return run_failure("generate", &error),
        Err(result) => return result,
    };

    let files = match write_artifacts(out_dir, &output) {
        Ok(files) => files,
        Err(error) => {
            return CommandResult::failure(
                "generate",
                "output_unwritable",
                format!("{error:#}"),
                EXIT_OUTPUT,
            );
        }
    };

    let documents = output
        .documents
        .values()
        .zip(files)
        .map(|(result, file)| DocumentLine {
            document: result.document_name.clone(),
            backend: result.backend_used.clone(),
            size_bytes: result.size_bytes,
            succeeded: result.succeeded,
            attempts: result.attempts.len(),
            file: file.display().to_string(),
        })
        .collect();
    let all_succeeded = output.all_succeeded();
    let report = GenerateReport {
        command: "generate",
        status: if all_succeeded { "ok" } else { "degraded" },
        run_id: output.run_id,
        input_sha256: output.input_sha256,
        out_dir: out_dir.display().to_string(),
        net_payable: output.summary.net_payable.to_string(),
        documents,
    };
    CommandResult::report(&report, if all_succeeded { 0 } else { EXIT_DEGRADED })
}

/// Writes every rendered document, error documents included, in the order
/// of `output.documents`.
fn write_artifacts(out_dir: &Path, output: &RunOutput) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("could not create output directory `{}`", out_dir.display()))?;

    output
        .documents
        .values()
        .map(|result| {
            let path = out_dir.join(&result.file_name);
            fs::write(&path, &result.bytes)
                .with_context(|| format!("could not write `{}`", path.display()))?;
            Ok(path)
        })
        .collect()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
