use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use crate::errors::BackendError;

const STDERR_EXCERPT: usize = 400;

/// Input/output file pair for one converter invocation. Both files are
/// removed when the value is dropped, including when the attempt is
/// abandoned on timeout.
pub(crate) struct ScratchFiles {
    pub html: PathBuf,
    pub pdf: PathBuf,
}

impl ScratchFiles {
    pub fn new(prefix: &str) -> Self {
        let dir = std::env::temp_dir();
        let id = Uuid::new_v4();
        Self {
            html: dir.join(format!("{prefix}_{id}.html")),
            pdf: dir.join(format!("{prefix}_{id}.pdf")),
        }
    }

    pub async fn write_html(&self, html: &str) -> Result<(), BackendError> {
        tokio::fs::write(&self.html, html)
            .await
            .map_err(|error| BackendError::Failed(format!("writing scratch html: {error}")))
    }

    pub async fn read_pdf(&self) -> Result<Vec<u8>, BackendError> {
        tokio::fs::read(&self.pdf)
            .await
            .map_err(|error| BackendError::Failed(format!("converter produced no file: {error}")))
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.html);
        let _ = std::fs::remove_file(&self.pdf);
    }
}

/// Resolves a converter executable: the configured path if it exists,
/// otherwise the first candidate found on `PATH`.
pub(crate) fn locate_executable(configured: Option<&Path>, candidates: &[&str]) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.exists().then(|| path.to_path_buf());
    }
    candidates.iter().find_map(|name| which::which(name).ok())
}

/// Runs a converter to completion. The child is killed if this future is
/// dropped before it exits.
pub(crate) async fn run_converter(program: &Path, args: Vec<OsString>) -> Result<(), BackendError> {
    debug!(
        event_name = "render.backend.spawn",
        program = %program.display(),
        "spawning converter"
    );
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| BackendError::Failed(format!("could not start converter: {error}")))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
    Err(BackendError::Failed(format!("converter exited with {}: {excerpt}", output.status)))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{locate_executable, ScratchFiles};

    #[test]
    fn configured_path_that_does_not_exist_is_not_located() {
        let missing = Path::new("/nonexistent/billpack/chromium");
        assert_eq!(locate_executable(Some(missing), &["sh"]), None);
    }

    #[test]
    fn unknown_candidates_are_not_located() {
        assert_eq!(locate_executable(None, &["billpack-no-such-converter"]), None);
    }

    #[tokio::test]
    async fn scratch_files_are_removed_on_drop() {
        let scratch = ScratchFiles::new("billpack_test");
        scratch.write_html("<p>x</p>").await.expect("scratch write");
        let html = scratch.html.clone();
        assert!(html.exists());
        drop(scratch);
        assert!(!html.exists());
    }
}
