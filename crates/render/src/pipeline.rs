//! Per-document fallback chain.
//!
//! Each document walks `Pending -> Attempting(0) -> Attempting(1) -> ...`
//! until one backend's output passes the quality gate, or ends in
//! `ErrorDocumentEmitted` with a synthesized placeholder. Attempts for one
//! document are strictly sequential; different documents render
//! concurrently, bounded by a semaphore. Each attempt runs in its own task,
//! so a panicking backend fails only that attempt.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use billpack_core::config::RenderConfig;
use billpack_core::domain::document::DocumentSpec;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::backend::{OutputFormat, RenderBackend};
use crate::environment::RenderEnvironment;
use crate::error_document::error_document;
use crate::errors::{BackendError, RenderFailure};

/// Identifier reported as `backend_used` for synthesized error documents.
pub const ERROR_DOCUMENT_BACKEND: &str = "error_document";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    Pending,
    Attempting(usize),
    Succeeded(usize),
    ErrorDocumentEmitted,
}

impl RenderState {
    /// Next state after the attempt at `index` produced `accepted`.
    pub fn advance(self, accepted: bool, backend_count: usize) -> Self {
        match self {
            Self::Pending if backend_count == 0 => Self::ErrorDocumentEmitted,
            Self::Pending => Self::Attempting(0),
            Self::Attempting(index) if accepted => Self::Succeeded(index),
            Self::Attempting(index) if index + 1 < backend_count => Self::Attempting(index + 1),
            Self::Attempting(_) => Self::ErrorDocumentEmitted,
            terminal => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::ErrorDocumentEmitted)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub backend: String,
    pub elapsed_ms: u64,
    pub error: Option<BackendError>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderResult {
    pub document_name: String,
    pub file_name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub backend_used: String,
    pub size_bytes: usize,
    pub succeeded: bool,
    pub failure: Option<RenderFailure>,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Clone)]
pub struct RenderPipeline {
    backends: Vec<Arc<dyn RenderBackend>>,
    attempt_timeout: Duration,
    min_output_bytes: usize,
    permits: Arc<Semaphore>,
}

impl RenderPipeline {
    pub fn new(backends: Vec<Arc<dyn RenderBackend>>, config: &RenderConfig) -> Self {
        Self {
            backends,
            attempt_timeout: Duration::from_secs(config.timeout_secs),
            min_output_bytes: config.min_output_bytes,
            permits: Arc::new(Semaphore::new(config.concurrency.max(1))),
        }
    }

    pub fn backends(&self) -> &[Arc<dyn RenderBackend>] {
        &self.backends
    }

    /// Renders every spec and returns exactly one result per spec, in input
    /// order. Dropping the returned future aborts all in-flight renders.
    pub async fn render_all(
        &self,
        specs: Vec<DocumentSpec>,
        env: Arc<RenderEnvironment>,
        file_stem: &str,
    ) -> Vec<RenderResult> {
        let names: Vec<String> = specs.iter().map(|spec| spec.name.clone()).collect();
        let mut tasks = JoinSet::new();
        for (index, spec) in specs.into_iter().enumerate() {
            let pipeline = self.clone();
            let env = Arc::clone(&env);
            let stem = file_stem.to_string();
            tasks.spawn(async move {
                let _permit = pipeline.permits.acquire().await.ok();
                (index, pipeline.render(&spec, &env, &stem).await)
            });
        }

        let mut results: Vec<Option<RenderResult>> = vec![None; names.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(join_error) => {
                    error!(
                        event_name = "render.document.task_failed",
                        error = %join_error,
                        "render task ended without a result"
                    );
                }
            }
        }

        results
            .into_iter()
            .zip(names)
            .map(|(result, name)| {
                result.unwrap_or_else(|| {
                    self.emit_error_document(
                        &name,
                        file_stem,
                        RenderFailure::AllBackendsFailed {
                            attempts: 0,
                            last_error: "render task aborted".to_string(),
                        },
                        Vec::new(),
                    )
                })
            })
            .collect()
    }

    /// Runs the fallback chain for one document.
    pub async fn render(
        &self,
        spec: &DocumentSpec,
        env: &Arc<RenderEnvironment>,
        file_stem: &str,
    ) -> RenderResult {
        let mut attempts = Vec::new();
        let mut state = RenderState::Pending.advance(false, self.backends.len());

        while let RenderState::Attempting(index) = state {
            let backend = &self.backends[index];
            let started = Instant::now();
            let outcome = self.attempt(backend, spec, env).await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(bytes) => {
                    attempts.push(AttemptRecord {
                        backend: backend.id().to_string(),
                        elapsed_ms,
                        error: None,
                    });
                    state = state.advance(true, self.backends.len());
                    debug!(event_name = "render.document.transition", document = %spec.name, ?state);
                    let format = backend.format();
                    info!(
                        event_name = "render.document.succeeded",
                        document = %spec.name,
                        backend = backend.id(),
                        attempt = index + 1,
                        size_bytes = bytes.len(),
                        "document rendered"
                    );
                    return RenderResult {
                        document_name: spec.name.clone(),
                        file_name: file_name(file_stem, &spec.name, format),
                        mime_type: format.mime_type().to_string(),
                        size_bytes: bytes.len(),
                        bytes,
                        backend_used: backend.id().to_string(),
                        succeeded: true,
                        failure: None,
                        attempts,
                    };
                }
                Err(error) => {
                    warn!(
                        event_name = "render.attempt.failed",
                        document = %spec.name,
                        backend = backend.id(),
                        error_class = error.error_class(),
                        error = %error,
                        "backend attempt failed"
                    );
                    attempts.push(AttemptRecord {
                        backend: backend.id().to_string(),
                        elapsed_ms,
                        error: Some(error),
                    });
                    state = state.advance(false, self.backends.len());
                    debug!(event_name = "render.document.transition", document = %spec.name, ?state);
                }
            }
        }

        let failure = RenderFailure::AllBackendsFailed {
            attempts: attempts.len(),
            last_error: attempts
                .iter()
                .rev()
                .find_map(|attempt| {
                    attempt.error.as_ref().map(|error| format!("{}: {error}", attempt.backend))
                })
                .unwrap_or_else(|| "no render backends configured".to_string()),
        };
        self.emit_error_document(&spec.name, file_stem, failure, attempts)
    }

    /// One bounded attempt plus the quality gate. The backend runs on its
    /// own task; a timed-out or dropped attempt aborts that task, which kills
    /// any converter process it spawned, and a panic becomes
    /// [`BackendError::Failed`].
    async fn attempt(
        &self,
        backend: &Arc<dyn RenderBackend>,
        spec: &DocumentSpec,
        env: &Arc<RenderEnvironment>,
    ) -> Result<Vec<u8>, BackendError> {
        let mut task = AbortOnDrop(tokio::spawn({
            let backend = Arc::clone(backend);
            let spec = spec.clone();
            let env = Arc::clone(env);
            async move { backend.render(&spec, &env).await }
        }));
        let bytes = tokio::time::timeout(self.attempt_timeout, &mut task.0)
            .await
            .map_err(|_| BackendError::TimedOut(self.attempt_timeout))?
            .map_err(attempt_task_error)??;
        quality_gate(backend.format(), &bytes, self.min_output_bytes)?;
        Ok(bytes)
    }

    fn emit_error_document(
        &self,
        document_name: &str,
        file_stem: &str,
        failure: RenderFailure,
        attempts: Vec<AttemptRecord>,
    ) -> RenderResult {
        error!(
            event_name = "render.document.error_document_emitted",
            document = %document_name,
            reason = %failure,
            "all backends failed, emitting error document"
        );
        let bytes = error_document(document_name, &failure.to_string(), Utc::now());
        RenderResult {
            document_name: document_name.to_string(),
            file_name: file_name(file_stem, document_name, OutputFormat::Pdf),
            mime_type: OutputFormat::Pdf.mime_type().to_string(),
            size_bytes: bytes.len(),
            bytes,
            backend_used: ERROR_DOCUMENT_BACKEND.to_string(),
            succeeded: false,
            failure: Some(failure),
            attempts,
        }
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn attempt_task_error(join_error: JoinError) -> BackendError {
    if join_error.is_panic() {
        BackendError::Failed(format!("backend panicked: {}", panic_message(join_error.into_panic())))
    } else {
        BackendError::Failed("backend task was cancelled".to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Output must exceed the size threshold and carry the format signature.
pub fn quality_gate(format: OutputFormat, bytes: &[u8], minimum: usize) -> Result<(), BackendError> {
    if bytes.len() <= minimum {
        return Err(BackendError::OutputTooSmall { size: bytes.len(), minimum });
    }
    if let Some(signature) = format.signature() {
        if !bytes.starts_with(signature) {
            return Err(BackendError::BadSignature {
                expected: String::from_utf8_lossy(signature).into_owned(),
            });
        }
    }
    Ok(())
}

pub fn file_name(stem: &str, document_name: &str, format: OutputFormat) -> String {
    format!("{stem}_{document_name}.{}", format.extension())
}
