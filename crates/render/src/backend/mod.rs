//! Renderer backends.
//!
//! Each backend turns one [`DocumentSpec`] into bytes or fails. Backends know
//! nothing about fallback, timeouts or quality gates; the pipeline owns those.

pub mod chromium;
pub mod html;
pub mod pdf_layout;
mod process;
pub mod text;
pub mod wkhtmltopdf;

use std::sync::Arc;

use async_trait::async_trait;
use billpack_core::config::{BackendKind, RenderConfig};
use billpack_core::domain::document::DocumentSpec;
use serde::Serialize;

use crate::environment::RenderEnvironment;
use crate::errors::BackendError;

pub use self::chromium::ChromiumBackend;
pub use self::html::HtmlBackend;
pub use self::pdf_layout::PrintPdfBackend;
pub use self::text::PlainTextBackend;
pub use self::wkhtmltopdf::WkhtmltopdfBackend;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Html,
    Text,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Html => "text/html; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
            Self::Text => "txt",
        }
    }

    /// Leading bytes every valid artifact of this format carries.
    pub fn signature(self) -> Option<&'static [u8]> {
        match self {
            Self::Pdf => Some(b"%PDF-".as_slice()),
            Self::Html | Self::Text => None,
        }
    }
}

#[async_trait]
pub trait RenderBackend: Send + Sync {
    fn id(&self) -> &str;

    fn format(&self) -> OutputFormat;

    /// Whether the backend can run at all on this host, e.g. whether its
    /// executable was found.
    fn is_available(&self) -> bool {
        true
    }

    async fn render(
        &self,
        spec: &DocumentSpec,
        env: &RenderEnvironment,
    ) -> Result<Vec<u8>, BackendError>;
}

/// Instantiates the configured backends in attempt order.
pub fn build_backends(config: &RenderConfig) -> Vec<Arc<dyn RenderBackend>> {
    config
        .backends
        .iter()
        .map(|kind| -> Arc<dyn RenderBackend> {
            match kind {
                BackendKind::Chromium => {
                    Arc::new(ChromiumBackend::discover(config.chromium_path.as_deref()))
                }
                BackendKind::Wkhtmltopdf => {
                    Arc::new(WkhtmltopdfBackend::discover(config.wkhtmltopdf_path.as_deref()))
                }
                BackendKind::PrintPdf => Arc::new(PrintPdfBackend),
                BackendKind::Html => Arc::new(HtmlBackend),
                BackendKind::Text => Arc::new(PlainTextBackend),
            }
        })
        .collect()
}

/// Greedy word wrap on character count. Words longer than `width` are
/// split.
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if current.is_empty() {
                word.len()
            } else {
                current.chars().count() + 1 + word.len()
            };
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
