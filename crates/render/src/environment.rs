use billpack_core::config::RenderConfig;

use crate::backend::html::HtmlRenderer;
use crate::errors::EnvironmentError;

/// Read-only state shared by every render in one process run: the render
/// settings and the loaded document template.
#[derive(Debug)]
pub struct RenderEnvironment {
    config: RenderConfig,
    html: HtmlRenderer,
}

impl RenderEnvironment {
    pub fn new(config: RenderConfig) -> Result<Self, EnvironmentError> {
        Ok(Self { config, html: HtmlRenderer::with_embedded_template()? })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn html(&self) -> &HtmlRenderer {
        &self.html
    }
}
