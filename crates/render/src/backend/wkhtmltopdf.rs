use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use billpack_core::domain::document::DocumentSpec;

use super::process::{locate_executable, run_converter, ScratchFiles};
use super::{OutputFormat, RenderBackend};
use crate::environment::RenderEnvironment;
use crate::errors::BackendError;

/// Converts the HTML rendition with wkhtmltopdf. Supports a CSS subset
/// only, so output is plainer than Chromium's.
#[derive(Clone, Debug)]
pub struct WkhtmltopdfBackend {
    executable: Option<PathBuf>,
}

impl WkhtmltopdfBackend {
    pub fn discover(configured: Option<&Path>) -> Self {
        Self { executable: locate_executable(configured, &["wkhtmltopdf"]) }
    }

    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }
}

#[async_trait]
impl RenderBackend for WkhtmltopdfBackend {
    fn id(&self) -> &str {
        "wkhtmltopdf"
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
            return Err(BackendError::Unavailable("wkhtmltopdf not found".to_string()));
        };

        let html = env.html().render(spec)?;
        let scratch = ScratchFiles::new("billpack_wkhtmltopdf");
        scratch.write_html(&html).await?;

        let mut args: Vec<OsString> = [
            "--quiet",
            "--page-size",
            "A4",
            "--margin-top",
            "10mm",
            "--margin-bottom",
            "10mm",
            "--margin-left",
            "10mm",
            "--margin-right",
            "10mm",
            "--encoding",
            "utf-8",
            "--enable-local-file-access",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(scratch.html.clone().into_os_string());
        args.push(scratch.pdf.clone().into_os_string());

        run_converter(executable, args).await?;
        scratch.read_pdf().await
    }
}
