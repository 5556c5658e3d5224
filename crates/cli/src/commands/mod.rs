pub mod config;
pub mod doctor;
pub mod generate;
pub mod summary;

use std::future::Future;
use std::path::Path;

use billpack_render::RunError;
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_INPUT: u8 = 4;
pub const EXIT_INGEST: u8 = 5;
pub const EXIT_DEGRADED: u8 = 6;
pub const EXIT_OUTPUT: u8 = 7;
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// A command-specific report, pretty-printed.
    pub fn report(payload: &impl Serialize, exit_code: u8) -> Self {
        let output = serde_json::to_string_pretty(payload).unwrap_or_else(|error| {
            fallback_payload(&error.to_string())
        });
        Self { exit_code, output }
    }
}

/// Drives `future` to completion on a fresh multi-threaded runtime.
pub(crate) fn block_on<F: Future>(command: &str, future: F) -> Result<F::Output, CommandResult> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map(|runtime| runtime.block_on(future))
        .map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        })
}

pub(crate) fn read_input(command: &str, path: &Path) -> Result<Vec<u8>, CommandResult> {
    std::fs::read(path).map_err(|error| {
        CommandResult::failure(
            command,
            "input_unreadable",
            format!("could not read `{}`: {error}", path.display()),
            EXIT_INPUT,
        )
    })
}

pub(crate) fn run_failure(command: &str, error: &RunError) -> CommandResult {
    let exit_code = match error {
        RunError::Ingest(_) => EXIT_INGEST,
        RunError::Cancelled => EXIT_CANCELLED,
        RunError::Task(_) => EXIT_RUNTIME,
    };
    CommandResult::failure(
        command,
        error.error_class(),
        format!("{} ({error})", error.user_message()),
        exit_code,
    )
}

fn serialize_payload(payload: &CommandOutcome) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| fallback_payload(&error.to_string()))
}

fn fallback_payload(message: &str) -> String {
    format!(
        "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
        message.replace('\\', "\\\\").replace('"', "\\\"")
    )
}
