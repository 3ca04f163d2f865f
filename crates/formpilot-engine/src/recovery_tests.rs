use std::sync::Arc;

use serde_json::json;

use formpilot_protocols::{FillFailure, JobContext, Profile, ProviderError};

use super::*;
use crate::testsupport::{MemoryLearningStore, MockPage, ScriptedProvider};

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

fn failed_report() -> FillReport {
    FillReport {
        filled: vec!["first_name".to_string()],
        failures: vec![FillFailure::new("country", "Option not matched: 'Mars'")],
    }
}

fn analyzer(
    outputs: Vec<Result<String, ProviderError>>,
) -> (Arc<MemoryLearningStore>, Arc<ScriptedProvider>, RecoveryAnalyzer) {
    let learning = Arc::new(MemoryLearningStore::default());
    let vision = Arc::new(ScriptedProvider::with_outputs(outputs));
    let analyzer = RecoveryAnalyzer::new(vision.clone(), learning.clone());
    (learning, vision, analyzer)
}

#[tokio::test]
async fn test_parses_verdict_and_persists_learning() {
    let (learning, _, analyzer) = analyzer(vec![Ok(json!({
        "issue": "Country value did not match any option",
        "solution": "Pick the closest listed option",
        "field_to_retry": "country",
        "new_value": "Canada",
        "needs_manual_intervention": false,
        "learned_pattern": "prefer listed option text"
    })
    .to_string())]);

    let verdict = analyzer
        .analyze(&MockPage::new(), &request(), &ResponseSet::new(), &failed_report())
        .await
        .unwrap();

    assert_eq!(verdict.retry(), Some(("country", "Canada")));
    assert!(!verdict.needs_manual_intervention);

    let entries = learning.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].fields, ["country"]);
    assert!(entries[0].issues.contains("Mars"));
    assert_eq!(entries[0].solution, "Pick the closest listed option");
}

#[tokio::test]
async fn test_unparsable_verdict_degrades_to_needs_human() {
    let raw = "The screenshot shows a captcha, a human should finish this.";
    let (learning, _, analyzer) = analyzer(vec![Ok(raw.to_string())]);

    let verdict = analyzer
        .analyze(&MockPage::new(), &request(), &ResponseSet::new(), &failed_report())
        .await
        .unwrap();

    assert!(verdict.needs_manual_intervention);
    assert!(verdict.retry().is_none());
    assert_eq!(verdict.solution, raw);
    // Degraded verdicts are still worth learning from.
    assert_eq!(learning.entries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_every_invocation_persists_even_duplicates() {
    let verdict = json!({ "issue": "same", "solution": "same" }).to_string();
    let (learning, _, analyzer) =
        analyzer(vec![Ok(verdict.clone()), Ok(verdict)]);

    let page = MockPage::new();
    let req = request();
    let report = failed_report();
    analyzer.analyze(&page, &req, &ResponseSet::new(), &report).await.unwrap();
    analyzer.analyze(&page, &req, &ResponseSet::new(), &report).await.unwrap();

    assert_eq!(learning.entries.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_vision_failure_propagates_without_learning_entry() {
    let (learning, _, analyzer) = analyzer(vec![Err(ProviderError::Timeout(120))]);

    let err = analyzer
        .analyze(&MockPage::new(), &request(), &ResponseSet::new(), &failed_report())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Provider(_)));
    assert!(learning.entries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_prompt_names_failed_fields() {
    let (_, vision, analyzer) = analyzer(vec![Ok("{}".to_string())]);
    let mut responses = ResponseSet::new();
    responses.insert("country", json!("Mars"));

    analyzer
        .analyze(&MockPage::new(), &request(), &responses, &failed_report())
        .await
        .unwrap();

    let prompts = vision.prompts.lock().unwrap();
    assert!(prompts[0].contains("country"));
    assert!(prompts[0].contains("Option not matched"));
    assert!(prompts[0].contains("Mars"));
}
