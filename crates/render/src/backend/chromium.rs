use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use billpack_core::domain::document::DocumentSpec;

use super::process::{locate_executable, run_converter, ScratchFiles};
use super::{OutputFormat, RenderBackend};
use crate::environment::RenderEnvironment;
use crate::errors::BackendError;

const CANDIDATES: &[&str] =
    &["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"];

/// Prints the HTML rendition through headless Chromium.
#[derive(Clone, Debug)]
pub struct ChromiumBackend {
    executable: Option<PathBuf>,
}

impl ChromiumBackend {
    pub fn discover(configured: Option<&Path>) -> Self {
        Self { executable: locate_executable(configured, CANDIDATES) }
    }

    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }
}

#[async_trait]
impl RenderBackend for ChromiumBackend {
    fn id(&self) -> &str {
        "chromium"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn is_available(&self) -> bool {
        self.executable.is_some()
    }

    async fn render(
        &self,
        spec: &DocumentSpec,
        env: &RenderEnvironment,
    ) -> Result<Vec<u8>, BackendError> {
        let Some(executable) = self.executable.as_deref() else {
            return Err(BackendError::Unavailable("chromium executable not found".to_string()));
        };

        let html = env.html().render(spec)?;
        let scratch = ScratchFiles::new("billpack_chromium");
        scratch.write_html(&html).await?;

        let mut print_to = OsString::from("--print-to-pdf=");
        print_to.push(&scratch.pdf);
        let mut page = OsString::from("file://");
        page.push(&scratch.html);

        let args = vec![
            OsString::from("--headless"),
            OsString::from("--disable-gpu"),
            OsString::from("--no-sandbox"),
            OsString::from("--no-pdf-header-footer"),
            print_to,
            page,
        ];
        run_converter(executable, args).await?;
        scratch.read_pdf().await
    }
}
