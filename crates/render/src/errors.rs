use std::time::Duration;

use billpack_core::errors::IngestError;
use serde::Serialize;
use thiserror::Error;

/// Why a single backend attempt did not produce an acceptable artifact.
/// Always non-fatal: the pipeline advances to the next backend.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "class", content = "detail", rename_all = "snake_case")]
pub enum BackendError {
    #[error("backend is unavailable: {0}")]
    Unavailable(String),
    #[error("backend failed: {0}")]
    Failed(String),
    #[error("backend did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("output of {size} bytes does not exceed the {minimum}-byte threshold")]
    OutputTooSmall { size: usize, minimum: usize },
    #[error("output does not start with the {expected} signature")]
    BadSignature { expected: String },
}

impl BackendError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "backend_unavailable",
            Self::Failed(_) => "backend_failed",
            Self::TimedOut(_) => "backend_timed_out",
            Self::OutputTooSmall { .. } | Self::BadSignature { .. } => "quality_gate_rejected",
        }
    }
}

/// Every backend in the chain failed for one document. The document is
/// still delivered, as a synthesized error document.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum RenderFailure {
    #[error("all {attempts} backend attempt(s) failed; last error: {last_error}")]
    AllBackendsFailed { attempts: usize, last_error: String },
}

/// Errors that abort a whole run. Nothing is returned alongside them.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("run was cancelled before all documents were rendered")]
    Cancelled,
    #[error("background task failed: {0}")]
    Task(String),
}

impl RunError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Ingest(error) => error.error_class(),
            Self::Cancelled => "cancelled",
            Self::Task(_) => "internal",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Ingest(error) => error.user_message(),
            Self::Cancelled => "Generation was cancelled. No documents were produced.",
            Self::Task(_) => "Generation stopped because of an internal error. Please retry.",
        }
    }
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("document template could not be loaded: {0}")]
    Template(String),
}
