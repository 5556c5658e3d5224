mod support;

use std::sync::Arc;
use std::time::Duration;

use billpack_core::audit::{AuditOutcome, AuditSink, InMemoryAuditSink};
use billpack_core::IngestError;
use billpack_render::backend::text::PlainTextBackend;
use billpack_render::{Orchestrator, RenderBackend, RunError, RunInput};
use rust_decimal::Decimal;

use support::{test_config, Behaviour, Scripted};

const WORKBOOK: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/../core/tests/fixtures/mdr12.xlsx"));
const NO_WORK_ORDER: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../core/tests/fixtures/no_work_order.xlsx"
));

fn text_chain() -> Vec<Arc<dyn RenderBackend>> {
    vec![
        Scripted::new("broken", Behaviour::Fail) as Arc<dyn RenderBackend>,
        Arc::new(PlainTextBackend),
    ]
}

fn input() -> RunInput {
    RunInput::new(WORKBOOK.to_vec()).with_filename("uploads/mdr12.xlsx")
}

#[tokio::test]
async fn full_run_produces_every_catalog_document() {
    let orchestrator =
        Orchestrator::with_backends(&test_config(), text_chain()).expect("orchestrator");

    let output = orchestrator.run(input()).await.expect("run succeeds");

    let names: Vec<&str> = output.documents.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        [
            "certificate_ii",
            "certificate_iii",
            "deviation_statement",
            "extra_items_statement",
            "final_bill_scrutiny_sheet",
            "first_page_summary",
        ]
    );
    assert!(output.all_succeeded());
    for (name, result) in &output.documents {
        assert_eq!(result.file_name, format!("mdr12_{name}.txt"));
        assert_eq!(result.backend_used, "text");
        assert_eq!(result.mime_type, "text/plain; charset=utf-8");
        assert_eq!(result.attempts.len(), 2);
    }

    let net: Decimal = "127865.128125".parse().expect("decimal");
    assert_eq!(output.summary.net_payable, net);
    assert_eq!(output.deviation.excess_amt, Decimal::from(3700));
    assert_eq!(output.ingest_report.coerced_cells(), 1);
}

#[tokio::test]
async fn rendered_text_carries_rounded_amounts() {
    let orchestrator =
        Orchestrator::with_backends(&test_config(), text_chain()).expect("orchestrator");
    let output = orchestrator.run(input()).await.expect("run succeeds");

    let summary = &output.documents["first_page_summary"];
    let text = String::from_utf8(summary.bytes.clone()).expect("utf-8 text");
    assert!(text.contains("Resurfacing of MDR-12 road"));
    assert!(text.contains("127865.13"), "net payable missing from:\n{text}");
}

#[tokio::test]
async fn repeated_runs_are_deterministic() {
    let orchestrator =
        Orchestrator::with_backends(&test_config(), text_chain()).expect("orchestrator");

    let first = orchestrator.run(input()).await.expect("first run");
    let second = orchestrator.run(input()).await.expect("second run");

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.input_sha256, second.input_sha256);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.deviation, second.deviation);
    for (name, result) in &first.documents {
        assert_eq!(result.bytes, second.documents[name].bytes, "{name} differs between runs");
    }
}

#[tokio::test]
async fn missing_work_order_aborts_before_rendering() {
    let sink = Arc::new(InMemoryAuditSink::default());
    let backend = Scripted::new("never", Behaviour::Pdf);
    let orchestrator = Orchestrator::with_backends(
        &test_config(),
        vec![Arc::clone(&backend) as Arc<dyn RenderBackend>],
    )
    .expect("orchestrator")
    .with_audit_sink(Arc::clone(&sink) as Arc<dyn AuditSink>, "tester");

    let error = orchestrator
        .run(RunInput::new(NO_WORK_ORDER.to_vec()))
        .await
        .expect_err("run must fail");

    assert!(matches!(
        error,
        RunError::Ingest(IngestError::MissingRequiredSheet { ref sheet }) if sheet == "Work Order"
    ));
    assert_eq!(backend.calls(), 0);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "ingest.failed");
    assert_eq!(events[0].outcome, AuditOutcome::Failed);
    assert_eq!(events[0].actor, "tester");
}

#[tokio::test]
async fn audit_trail_follows_the_run() {
    let sink = Arc::new(InMemoryAuditSink::default());
    let orchestrator = Orchestrator::with_backends(&test_config(), text_chain())
        .expect("orchestrator")
        .with_audit_sink(Arc::clone(&sink) as Arc<dyn AuditSink>, "tester");

    let output = orchestrator.run(input()).await.expect("run succeeds");
    let events = sink.events();

    assert!(events.iter().all(|event| event.run_id == output.run_id));
    assert_eq!(events[0].event_type, "ingest.completed");
    assert_eq!(events[0].outcome, AuditOutcome::Degraded);
    assert_eq!(events[0].metadata["input_sha256"], output.input_sha256);
    assert_eq!(events[1].event_type, "finance.summary_computed");

    let failed_attempts =
        events.iter().filter(|event| event.event_type == "render.attempt_failed").count();
    let completed: Vec<_> = events
        .iter()
        .filter(|event| event.event_type == "render.document_completed")
        .collect();
    assert_eq!(failed_attempts, 6);
    assert_eq!(completed.len(), 6);
    assert!(completed.iter().all(|event| event.outcome == AuditOutcome::Degraded));
    assert!(completed.iter().all(|event| event.document.is_some()));
}

#[tokio::test]
async fn run_until_stops_on_shutdown() {
    let mut config = test_config();
    config.render.timeout_secs = 600;
    let hanging = Scripted::new("hanging", Behaviour::Hang);
    let orchestrator = Orchestrator::with_backends(
        &config,
        vec![Arc::clone(&hanging) as Arc<dyn RenderBackend>],
    )
    .expect("orchestrator");

    let error = orchestrator
        .run_until(input(), tokio::time::sleep(Duration::from_millis(300)))
        .await
        .expect_err("run is cancelled");

    assert!(matches!(error, RunError::Cancelled));
    assert_eq!(error.error_class(), "cancelled");
}

#[tokio::test]
async fn analyze_skips_rendering() {
    let backend = Scripted::new("unused", Behaviour::Pdf);
    let orchestrator = Orchestrator::with_backends(
        &test_config(),
        vec![Arc::clone(&backend) as Arc<dyn RenderBackend>],
    )
    .expect("orchestrator");

    let analysis = orchestrator.analyze(WORKBOOK.to_vec()).await.expect("analysis");

    assert_eq!(analysis.model.work_order.len(), 4);
    assert_eq!(analysis.input_sha256.len(), 64);
    assert_eq!(analysis.deviation.totals.saving_amt, "11251.25".parse::<Decimal>().expect("dec"));
    assert_eq!(backend.calls(), 0);
}
