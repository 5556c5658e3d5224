use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use billpack_core::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink, NoopAuditSink};
use billpack_core::compose::{ComposeInput, DocumentComposer};
use billpack_core::config::AppConfig;
use billpack_core::domain::deviation::{DeviationReport, DeviationTotals};
use billpack_core::domain::line_item::BillOfQuantities;
use billpack_core::domain::summary::FinancialSummary;
use billpack_core::finance::{FinancialEngine, StandardFinancialEngine};
use billpack_core::ingest::{input_fingerprint, IngestReport, SheetIngestor};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{build_backends, RenderBackend};
use crate::environment::RenderEnvironment;
use crate::errors::{EnvironmentError, RunError};
use crate::pipeline::{RenderPipeline, RenderResult};

const DEFAULT_STEM: &str = "bill";

#[derive(Clone, Debug, Default)]
pub struct RunInput {
    pub bytes: Vec<u8>,
    /// Only used to name the output files.
    pub filename: Option<String>,
}

impl RunInput {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, filename: None }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    fn file_stem(&self) -> String {
        self.filename
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .map(|stem| stem.to_string_lossy().trim().to_string())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| DEFAULT_STEM.to_string())
    }
}

/// Ingested model plus everything derived from it, without rendering.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub model: BillOfQuantities,
    pub report: IngestReport,
    pub summary: FinancialSummary,
    pub deviation: DeviationReport,
    pub input_sha256: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunOutput {
    pub run_id: String,
    pub input_sha256: String,
    /// Keyed by document name; one entry per catalog document.
    pub documents: BTreeMap<String, RenderResult>,
    pub summary: FinancialSummary,
    pub deviation: DeviationTotals,
    pub ingest_report: IngestReport,
}

impl RunOutput {
    pub fn all_succeeded(&self) -> bool {
        self.documents.values().all(|result| result.succeeded)
    }
}

/// Drives ingest, finance, composition and rendering for one workbook.
pub struct Orchestrator {
    env: Arc<RenderEnvironment>,
    engine: Arc<dyn FinancialEngine>,
    composer: DocumentComposer,
    pipeline: RenderPipeline,
    audit: Arc<dyn AuditSink>,
    actor: String,
}

impl Orchestrator {
    pub fn new(config: &AppConfig) -> Result<Self, EnvironmentError> {
        let backends = build_backends(&config.render);
        Self::with_backends(config, backends)
    }

    /// Uses the given backend chain instead of the configured one.
    pub fn with_backends(
        config: &AppConfig,
        backends: Vec<Arc<dyn RenderBackend>>,
    ) -> Result<Self, EnvironmentError> {
        let env = RenderEnvironment::new(config.render.clone())?;
        let pipeline = RenderPipeline::new(backends, &config.render);
        Ok(Self {
            env: Arc::new(env),
            engine: Arc::new(StandardFinancialEngine::new(config.finance.rates)),
            composer: DocumentComposer::new(config.finance.display_precision, config.finance.rates),
            pipeline,
            audit: Arc::new(NoopAuditSink),
            actor: "billpack".to_string(),
        })
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>, actor: impl Into<String>) -> Self {
        self.audit = audit;
        self.actor = actor.into();
        self
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Ingests and computes the financial results without rendering.
    pub async fn analyze(&self, bytes: Vec<u8>) -> Result<Analysis, RunError> {
        let input_sha256 = input_fingerprint(&bytes);
        let ingested = tokio::task::spawn_blocking(move || SheetIngestor.ingest_with_report(&bytes))
            .await
            .map_err(|error| RunError::Task(error.to_string()))??;

        let summary = self.engine.summarize(&ingested.model);
        let deviation = self.engine.deviation(&ingested.model);
        Ok(Analysis {
            model: ingested.model,
            report: ingested.report,
            summary,
            deviation,
            input_sha256,
        })
    }

    pub async fn run(&self, input: RunInput) -> Result<RunOutput, RunError> {
        let stem = input.file_stem();
        let context = AuditContext::new(input.filename.clone().unwrap_or_default(), &self.actor);

        let analysis = match self.analyze(input.bytes).await {
            Ok(analysis) => analysis,
            Err(error) => {
                warn!(
                    event_name = "run.ingest.failed",
                    run_id = %context.run_id,
                    error_class = error.error_class(),
                    error = %error,
                    "ingestion failed, run aborted"
                );
                self.audit.emit(
                    context
                        .event("ingest.failed", AuditCategory::Ingest, AuditOutcome::Failed)
                        .with_metadata("error_class", error.error_class()),
                );
                return Err(error);
            }
        };
        self.record_analysis(&context, &analysis);

        let specs = self.composer.compose_all(&ComposeInput {
            model: &analysis.model,
            summary: &analysis.summary,
            deviation: &analysis.deviation,
        });
        let results = self.pipeline.render_all(specs, Arc::clone(&self.env), &stem).await;
        for result in &results {
            self.record_render(&context, result);
        }

        let documents: BTreeMap<String, RenderResult> =
            results.into_iter().map(|result| (result.document_name.clone(), result)).collect();
        info!(
            event_name = "run.completed",
            run_id = %context.run_id,
            documents = documents.len(),
            failed = documents.values().filter(|result| !result.succeeded).count(),
            "run completed"
        );

        Ok(RunOutput {
            run_id: context.run_id,
            input_sha256: analysis.input_sha256,
            documents,
            summary: analysis.summary,
            deviation: analysis.deviation.totals,
            ingest_report: analysis.report,
        })
    }

    /// Like [`Orchestrator::run`], but gives up when `shutdown` resolves.
    /// In-flight converter processes are killed and nothing is returned.
    pub async fn run_until<F>(&self, input: RunInput, shutdown: F) -> Result<RunOutput, RunError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            output = self.run(input) => output,
            () = shutdown => {
                warn!(event_name = "run.cancelled", "run cancelled, discarding partial output");
                Err(RunError::Cancelled)
            }
        }
    }

    fn record_analysis(&self, context: &AuditContext, analysis: &Analysis) {
        let coerced = analysis.report.coerced_cells();
        info!(
            event_name = "run.ingest.completed",
            run_id = %context.run_id,
            work_order_items = analysis.model.work_order.len(),
            bill_quantity_items = analysis.model.bill_quantity.len(),
            extra_items = analysis.model.extra_items.len(),
            coerced_cells = coerced,
            "workbook ingested"
        );
        let outcome = if coerced > 0 { AuditOutcome::Degraded } else { AuditOutcome::Success };
        self.audit.emit(
            context
                .event("ingest.completed", AuditCategory::Ingest, outcome)
                .with_metadata("input_sha256", analysis.input_sha256.clone())
                .with_metadata("coerced_cells", coerced.to_string()),
        );
        self.audit.emit(
            context
                .event("finance.summary_computed", AuditCategory::Finance, AuditOutcome::Success)
                .with_metadata("gross_total", analysis.summary.gross_total.to_string())
                .with_metadata("net_payable", analysis.summary.net_payable.to_string())
                .with_metadata(
                    "net_deviation",
                    analysis.deviation.totals.net_deviation.to_string(),
                ),
        );
    }

    fn record_render(&self, context: &AuditContext, result: &RenderResult) {
        for attempt in &result.attempts {
            if let Some(error) = &attempt.error {
                self.audit.emit(
                    context
                        .event("render.attempt_failed", AuditCategory::Render, AuditOutcome::Failed)
                        .for_document(&result.document_name)
                        .with_metadata("backend", attempt.backend.clone())
                        .with_metadata("error_class", error.error_class()),
                );
            }
        }

        let (event_type, outcome) = if !result.succeeded {
            ("render.error_document_emitted", AuditOutcome::Failed)
        } else if result.attempts.len() > 1 {
            ("render.document_completed", AuditOutcome::Degraded)
        } else {
            ("render.document_completed", AuditOutcome::Success)
        };
        self.audit.emit(
            context
                .event(event_type, AuditCategory::Render, outcome)
                .for_document(&result.document_name)
                .with_metadata("backend", result.backend_used.clone())
                .with_metadata("size_bytes", result.size_bytes.to_string()),
        );
    }
}
