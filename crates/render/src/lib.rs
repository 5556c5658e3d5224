pub mod backend;
pub mod environment;
pub mod error_document;
pub mod errors;
pub mod orchestrator;
pub mod pipeline;

pub use backend::{build_backends, OutputFormat, RenderBackend};
pub use environment::RenderEnvironment;
pub use errors::{BackendError, EnvironmentError, RenderFailure, RunError};
pub use orchestrator::{Analysis, Orchestrator, RunInput, RunOutput};
pub use pipeline::{AttemptRecord, RenderPipeline, RenderResult, RenderState};
