use super::*;
use std::time::Duration;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> AnthropicProvider {
    AnthropicProvider::new("test-key", "claude-sonnet-4-20250514").with_base_url(server.uri())
}

fn text_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "id": "msg_01",
        "model": "claude-sonnet-4-20250514",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 5}
    }))
}

#[test]
fn test_provider_id() {
    let provider = AnthropicProvider::new("test-key", "claude-sonnet-4-20250514");
    assert_eq!(provider.id(), "anthropic");
}

#[test]
fn test_build_request_plain() {
    let provider = AnthropicProvider::new("test-key", "claude-sonnet-4-20250514");
    let options = CompletionOptions::default();
    let request = provider.build_request(ApiContent::Text("Hello".to_string()), &options);

    assert_eq!(request.model, "claude-sonnet-4-20250514");
    assert_eq!(request.max_tokens, 2048);
    assert!(request.system.is_none());
}

#[test]
fn test_build_request_json_mode_sets_system() {
    let provider = AnthropicProvider::new("test-key", "claude-sonnet-4-20250514");
    let options = CompletionOptions::json();
    let request = provider.build_request(ApiContent::Text("Hello".to_string()), &options);

    let system = request.system.unwrap();
    assert!(system.contains("JSON object only"));
}

#[tokio::test]
async fn test_generate_success() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/messages"))
        .and(matchers::header("x-api-key", "test-key"))
        .and(matchers::header("anthropic-version", API_VERSION))
        .respond_with(text_response(r#"{"first_name": "Ada"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .generate("Fill the form", &CompletionOptions::json())
        .await
        .unwrap();
    assert!(result.contains("Ada"));
}

#[tokio::test]
async fn test_generate_with_image_sends_image_block() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/messages"))
        .and(matchers::body_string_contains("image/jpeg"))
        .and(matchers::body_string_contains("aGVsbG8="))
        .respond_with(text_response("the page shows a validation error"))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .generate_with_image(
            "What went wrong?",
            "aGVsbG8=",
            &CompletionOptions::default(),
        )
        .await
        .unwrap();
    assert!(result.contains("validation error"));
}

#[tokio::test]
async fn test_authentication_failure() {
    let server = MockServer::start().await;
    let error_body =
        r#"{"error": {"type": "authentication_error", "message": "Invalid API key"}}"#;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string(error_body))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("Hello", &CompletionOptions::default())
        .await
        .unwrap_err();
    match err {
        ProviderError::AuthenticationFailed(message) => {
            assert!(message.contains("Invalid API key"));
        }
        other => panic!("Expected AuthenticationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after_header() {
    let server = MockServer::start().await;
    let error_body = r#"{"error": {"type": "rate_limit_error", "message": "Too many requests"}}"#;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/messages"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_string(error_body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("Hello", &CompletionOptions::default())
        .await
        .unwrap_err();
    match err {
        ProviderError::RateLimited {
            retry_after_seconds,
        } => assert_eq!(retry_after_seconds, 7),
        other => panic!("Expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("Hello", &CompletionOptions::default())
        .await
        .unwrap_err();
    match err {
        ProviderError::ApiError { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("Internal Server Error"));
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_completion_is_empty_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/messages"))
        .respond_with(text_response("   "))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("Hello", &CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::EmptyCompletion));
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/messages"))
        .respond_with(text_response("too late").set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let options = CompletionOptions::default().with_timeout(Duration::from_millis(50));
    let err = provider(&server)
        .generate("Hello", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Timeout(_)));
}
