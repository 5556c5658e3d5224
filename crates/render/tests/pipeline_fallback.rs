mod support;

use billpack_core::domain::document::{DocumentKind, DocumentSpec};
use billpack_render::pipeline::ERROR_DOCUMENT_BACKEND;
use billpack_render::{BackendError, RenderFailure, RenderPipeline};

use support::{as_backends, environment, test_config, Behaviour, Scripted};

fn spec(kind: DocumentKind) -> DocumentSpec {
    let mut spec = DocumentSpec::new(kind);
    spec.paragraph("Certified that the quantities billed were executed.");
    spec
}

#[tokio::test(start_paused = true)]
async fn second_backend_is_used_when_the_first_fails() {
    let config = test_config();
    let first = Scripted::new("first", Behaviour::Fail);
    let second = Scripted::new("second", Behaviour::Pdf);
    let pipeline = RenderPipeline::new(as_backends(&[&first, &second]), &config.render);

    let result =
        pipeline.render(&spec(DocumentKind::CertificateII), &environment(&config), "bill").await;

    assert!(result.succeeded);
    assert_eq!(result.backend_used, "second");
    assert_eq!(result.size_bytes, result.bytes.len());
    assert_eq!(result.file_name, "bill_certificate_ii.pdf");
    assert_eq!(result.attempts.len(), 2);
    assert!(matches!(result.attempts[0].error, Some(BackendError::Failed(_))));
    assert_eq!(result.attempts[1].error, None);
}

#[tokio::test(start_paused = true)]
async fn later_backends_are_not_tried_after_a_success() {
    let config = test_config();
    let first = Scripted::new("first", Behaviour::Pdf);
    let second = Scripted::new("second", Behaviour::Pdf);
    let pipeline = RenderPipeline::new(as_backends(&[&first, &second]), &config.render);

    let result =
        pipeline.render(&spec(DocumentKind::CertificateIII), &environment(&config), "bill").await;

    assert_eq!(result.backend_used, "first");
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn all_failures_yield_a_non_empty_error_document() {
    let config = test_config();
    let failing = Scripted::new("failing", Behaviour::Fail);
    let tiny = Scripted::new("tiny", Behaviour::Tiny);
    let unsigned = Scripted::new("unsigned", Behaviour::UnsignedPdf);
    let pipeline = RenderPipeline::new(as_backends(&[&failing, &tiny, &unsigned]), &config.render);

    let result = pipeline
        .render(&spec(DocumentKind::DeviationStatement), &environment(&config), "bill")
        .await;

    assert!(!result.succeeded);
    assert_eq!(result.backend_used, ERROR_DOCUMENT_BACKEND);
    assert!(result.bytes.starts_with(b"%PDF-"));
    assert!(!result.bytes.is_empty());
    assert_eq!(result.mime_type, "application/pdf");

    let errors: Vec<&'static str> = result
        .attempts
        .iter()
        .filter_map(|attempt| attempt.error.as_ref().map(BackendError::error_class))
        .collect();
    assert_eq!(errors, ["backend_failed", "quality_gate_rejected", "quality_gate_rejected"]);
    match result.failure {
        Some(RenderFailure::AllBackendsFailed { attempts, last_error }) => {
            assert_eq!(attempts, 3);
            assert!(last_error.starts_with("unsigned:"));
        }
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn hanging_backend_times_out_and_the_chain_advances() {
    let config = test_config();
    let hanging = Scripted::new("hanging", Behaviour::Hang);
    let fallback = Scripted::new("fallback", Behaviour::Pdf);
    let pipeline = RenderPipeline::new(as_backends(&[&hanging, &fallback]), &config.render);

    let result = pipeline
        .render(&spec(DocumentKind::FirstPageSummary), &environment(&config), "bill")
        .await;

    assert!(result.succeeded);
    assert_eq!(result.backend_used, "fallback");
    assert!(matches!(result.attempts[0].error, Some(BackendError::TimedOut(_))));
}

#[tokio::test(start_paused = true)]
async fn panicking_backend_fails_its_attempt_and_the_chain_advances() {
    let config = test_config();
    let crashing = Scripted::new("crashing", Behaviour::Panic);
    let good = Scripted::new("good", Behaviour::Pdf);
    let pipeline = RenderPipeline::new(as_backends(&[&crashing, &good]), &config.render);

    let results = pipeline
        .render_all(vec![spec(DocumentKind::CertificateIII)], environment(&config), "bill")
        .await;

    let result = &results[0];
    assert!(result.succeeded);
    assert_eq!(result.backend_used, "good");
    assert_eq!(result.attempts.len(), 2);
    match &result.attempts[0].error {
        Some(BackendError::Failed(message)) => {
            assert!(message.starts_with("backend panicked: crashing crashed"), "{message}");
        }
        other => panic!("unexpected attempt error: {other:?}"),
    }
    assert_eq!(good.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_backend_chain_still_returns_a_document() {
    let config = test_config();
    let pipeline = RenderPipeline::new(Vec::new(), &config.render);

    let result =
        pipeline.render(&spec(DocumentKind::CertificateII), &environment(&config), "bill").await;

    assert!(!result.succeeded);
    assert!(result.attempts.is_empty());
    assert!(result.bytes.starts_with(b"%PDF-"));
}

#[tokio::test(start_paused = true)]
async fn render_all_returns_one_result_per_spec_in_order() {
    let config = test_config();
    let flaky = Scripted::new("flaky", Behaviour::Fail);
    let steady = Scripted::new("steady", Behaviour::Pdf);
    let pipeline = RenderPipeline::new(as_backends(&[&flaky, &steady]), &config.render);

    let specs: Vec<DocumentSpec> = DocumentKind::ALL.into_iter().map(spec).collect();
    let results = pipeline.render_all(specs, environment(&config), "MDR-12").await;

    let names: Vec<&str> = results.iter().map(|result| result.document_name.as_str()).collect();
    let expected: Vec<&str> = DocumentKind::ALL.iter().map(|kind| kind.slug()).collect();
    assert_eq!(names, expected);
    assert!(results.iter().all(|result| result.succeeded && result.backend_used == "steady"));
    assert_eq!(results[0].file_name, "MDR-12_first_page_summary.pdf");
}

#[tokio::test(start_paused = true)]
async fn concurrent_documents_respect_the_limit() {
    let mut config = test_config();
    config.render.concurrency = 2;
    let backend = Scripted::new("slow", Behaviour::Pdf);
    let pipeline = RenderPipeline::new(as_backends(&[&backend]), &config.render);

    let specs: Vec<DocumentSpec> =
        DocumentKind::ALL.into_iter().chain(DocumentKind::ALL).map(spec).collect();
    let results = pipeline.render_all(specs, environment(&config), "bill").await;

    assert_eq!(results.len(), 12);
    assert_eq!(backend.calls(), 12);
    assert!(backend.peak() <= 2, "peak concurrency was {}", backend.peak());
    assert!(backend.peak() >= 1);
}
