use std::sync::Arc;

use serde_json::json;

use formpilot_protocols::{GenerationError, JobContext, Profile};

use crate::driver::FillOptions;
use crate::generator::GeneratorOptions;
use crate::testsupport::{FixedCaptchaSolver, MemoryLearningStore, MockPage, ScriptedProvider};

use super::*;

fn request() -> AttemptRequest {
    AttemptRequest::new(
        "https://boards.example.com/acme/42",
        "greenhouse_acme",
        Profile::new(json!({ "personal_info": { "first_name": "Ada" } })),
    )
    .with_job(JobContext {
        title: "Engineer".to_string(),
        company: "Acme".to_string(),
        description: String::new(),
    })
}

fn recorder(model_output: &str) -> AdaptiveRecorder {
    let generator = ResponseGenerator::new(
        Arc::new(ScriptedProvider::single(model_output)),
        GeneratorOptions::default(),
    );
    let driver = FormDriver::new(FillOptions {
        pacing_ms: None,
        resume_path: None,
    });
    AdaptiveRecorder::new(generator, driver)
}

fn two_field_snapshot() -> serde_json::Value {
    json!({
        "elements": [
            { "tag": "input", "type": "text", "id": "first_name", "name": "first_name" },
            { "tag": "input", "type": "email", "id": "email", "name": "email" }
        ],
        "submit": null,
        "has_captcha": false
    })
}

#[tokio::test]
async fn test_successful_pass_yields_outcome_with_steps() {
    let page = MockPage::new();
    page.push_eval(two_field_snapshot());

    let outcome = recorder(r#"{"first_name": "Ada", "email": "ada@example.com"}"#)
        .record(&page, &request())
        .await
        .unwrap();

    assert_eq!(outcome.report.filled.len(), 2);
    assert!(outcome.report.failures.is_empty());
    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.ats_type, "greenhouse");
    assert_eq!(page.value_of("[id='first_name']").as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_empty_extraction_fails_fast() {
    let page = MockPage::new();
    page.push_eval(json!({ "elements": [], "submit": null, "has_captcha": false }));

    let err = recorder("{}").record(&page, &request()).await.unwrap_err();
    assert!(matches!(err, RecordingError::NothingExtracted));
}

#[tokio::test]
async fn test_captcha_without_solver_hard_stops() {
    let page = MockPage::new();
    page.push_eval(json!({
        "elements": [{ "tag": "input", "type": "text", "name": "x" }],
        "submit": null,
        "has_captcha": true
    }));

    let err = recorder("{}").record(&page, &request()).await.unwrap_err();
    assert!(matches!(
        err,
        RecordingError::Captcha(CaptchaError::Unsolved)
    ));
}

#[tokio::test]
async fn test_solved_captcha_continues() {
    let page = MockPage::new();
    page.push_eval(json!({
        "elements": [{ "tag": "input", "type": "text", "id": "x", "name": "x" }],
        "submit": null,
        "has_captcha": true
    }));

    let outcome = recorder(r#"{"x": "value"}"#)
        .with_captcha_solver(Arc::new(FixedCaptchaSolver(true)))
        .record(&page, &request())
        .await
        .unwrap();

    assert_eq!(outcome.report.filled, ["x"]);
}

#[tokio::test]
async fn test_unsolved_captcha_passes_with_override() {
    let page = MockPage::new();
    page.push_eval(json!({
        "elements": [{ "tag": "input", "type": "text", "id": "x", "name": "x" }],
        "submit": null,
        "has_captcha": true
    }));

    let outcome = recorder(r#"{"x": "value"}"#)
        .allow_unsolved_captcha(true)
        .record(&page, &request())
        .await
        .unwrap();

    assert_eq!(outcome.report.filled, ["x"]);
}

#[tokio::test]
async fn test_below_threshold_fails_the_recording() {
    let page = MockPage::new();
    page.push_eval(two_field_snapshot());
    // One of two fields unfillable: 50% is under the default 70%.
    page.mark_missing("[id='email']");
    page.mark_missing("input[name='email']");
    page.mark_missing("[name='email']");
    page.mark_missing("input[type='email'][name='email']");

    let err = recorder(r#"{"first_name": "Ada", "email": "ada@example.com"}"#)
        .record(&page, &request())
        .await
        .unwrap_err();

    match err {
        RecordingError::BelowThreshold(detail) => {
            assert!(detail.contains("1/2"));
            assert!(detail.contains("email"));
        }
        other => panic!("expected threshold failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_required_field_without_answer_fails_the_recording() {
    let page = MockPage::new();
    page.push_eval(json!({
        "elements": [
            { "tag": "input", "type": "text", "id": "first_name", "name": "first_name" },
            { "tag": "input", "type": "email", "id": "email", "name": "email", "required": true }
        ],
        "submit": null,
        "has_captcha": false
    }));

    // The model skips the required email; the fill pass alone would look
    // clean because an unanswered field is simply not visited.
    let err = recorder(r#"{"first_name": "Ada"}"#)
        .record(&page, &request())
        .await
        .unwrap_err();

    match err {
        RecordingError::BelowThreshold(detail) => {
            assert!(detail.contains("email"));
            assert!(detail.contains("1/2"));
        }
        other => panic!("expected threshold failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_recovery_retry_promotes_failed_field() {
    let page = MockPage::new();
    page.push_eval(json!({
        "elements": [
            { "tag": "input", "type": "text", "id": "first_name", "name": "first_name" },
            { "tag": "select", "id": "country", "name": "country",
              "options": [
                  { "value": "US", "text": "United States" },
                  { "value": "CA", "text": "Canada" }
              ] }
        ],
        "submit": null,
        "has_captcha": false
    }));

    let vision = Arc::new(ScriptedProvider::single(
        &json!({
            "issue": "No option named Mars",
            "solution": "Use a listed option",
            "field_to_retry": "country",
            "new_value": "Canada"
        })
        .to_string(),
    ));
    let learning = Arc::new(MemoryLearningStore::default());

    let outcome = recorder(r#"{"first_name": "Ada", "country": "Mars"}"#)
        .with_recovery(RecoveryAnalyzer::new(vision, learning.clone()))
        .record(&page, &request())
        .await
        .unwrap();

    assert_eq!(outcome.report.filled.len(), 2);
    assert!(outcome.report.failures.is_empty());
    assert_eq!(page.value_of("[id='country']").as_deref(), Some("CA"));
    // The retried fill is part of the recorded step log.
    assert!(outcome
        .steps
        .iter()
        .any(|s| s.field_name.as_deref() == Some("country")));
    assert_eq!(learning.entries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_generation_failure_records_nothing() {
    let page = MockPage::new();
    page.push_eval(two_field_snapshot());

    let err = recorder("not json at all")
        .record(&page, &request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RecordingError::Generation(GenerationError::Unparsable(_))
    ));
    assert!(page.final_values().is_empty());
}

#[tokio::test]
async fn test_outcome_cost_uses_configured_recording_cost() {
    let page = MockPage::new();
    page.push_eval(two_field_snapshot());

    let outcome = recorder(r#"{"first_name": "Ada", "email": "ada@example.com"}"#)
        .with_recording_cost(1.25)
        .record(&page, &request())
        .await
        .unwrap();

    assert!((outcome.cost - 1.25).abs() < f64::EPSILON);
}
