#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use billpack_core::config::AppConfig;
use billpack_core::domain::document::DocumentSpec;
use billpack_render::{BackendError, OutputFormat, RenderBackend, RenderEnvironment};

#[derive(Clone, Copy, Debug)]
pub enum Behaviour {
    Fail,
    Panic,
    Hang,
    Tiny,
    UnsignedPdf,
    Pdf,
}

/// Backend with a fixed, scripted outcome that counts its calls and the
/// peak number of concurrent calls.
pub struct Scripted {
    id: &'static str,
    behaviour: Behaviour,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl Scripted {
    pub fn new(id: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            id,
            behaviour,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.resize(len, b' ');
    bytes
}

#[async_trait]
impl RenderBackend for Scripted {
    fn id(&self) -> &str {
        self.id
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    async fn render(
        &self,
        spec: &DocumentSpec,
        _env: &RenderEnvironment,
    ) -> Result<Vec<u8>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let outcome = match self.behaviour {
            Behaviour::Fail => Err(BackendError::Failed(format!("{} refused {}", self.id, spec.name))),
            Behaviour::Panic => panic!("{} crashed while rendering {}", self.id, spec.name),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(pdf_bytes(4_096))
            }
            Behaviour::Tiny => Ok(b"%PDF-".to_vec()),
            Behaviour::UnsignedPdf => Ok(vec![b'<'; 4_096]),
            Behaviour::Pdf => Ok(pdf_bytes(4_096)),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

pub fn as_backends(backends: &[&Arc<Scripted>]) -> Vec<Arc<dyn RenderBackend>> {
    backends.iter().map(|backend| Arc::clone(*backend) as Arc<dyn RenderBackend>).collect()
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.render.timeout_secs = 5;
    config.render.min_output_bytes = 64;
    config.render.concurrency = 2;
    config
}

pub fn environment(config: &AppConfig) -> Arc<RenderEnvironment> {
    Arc::new(RenderEnvironment::new(config.render.clone()).expect("environment builds"))
}
