//! Integration tests for the Groq text backend
//!
//! Runs the provider against wiremock servers standing in for the API.

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use avatalk_engine::config::TextBackendConfig;
use avatalk_engine::llm::{groq::GroqProvider, LLMError, Message, TextBackend};
use avatalk_engine::secrets::SecretString;
use sdk::errors::EngineError;

fn provider(server: &MockServer) -> GroqProvider {
    let config = TextBackendConfig {
        base_url: format!("{}/openai/v1", server.uri()),
        request_timeout_secs: 5,
    };
    GroqProvider::new(&config, SecretString::new("gsk_test_key")).unwrap()
}

#[tokio::test]
async fn test_completion_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk_test_key"))
        .and(body_partial_json(json!({
            "model": "llama-3.3-70b-versatile",
            "messages": [
                {"role": "system", "content": "Tone: Friendly"},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hi there!"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = provider(&server)
        .complete(
            &[Message::system("Tone: Friendly"), Message::user("Hello")],
            "llama-3.3-70b-versatile",
        )
        .await
        .unwrap();

    assert_eq!(reply, "Hi there!");
}

#[tokio::test]
async fn test_auth_failure_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Invalid API Key",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(&[Message::user("Hello")], "llama-3.3-70b-versatile")
        .await
        .unwrap_err();

    match &err {
        LLMError::AuthenticationFailed(msg) => assert_eq!(msg, "Invalid API Key"),
        other => panic!("Expected AuthenticationFailed, got {:?}", other),
    }
    assert!(matches!(
        EngineError::from(err),
        EngineError::BackendRejected(_)
    ));
}

#[tokio::test]
async fn test_unknown_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "message": "The model `gpt-9` does not exist",
                "type": "invalid_request_error",
                "code": "model_not_found"
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(&[Message::user("Hello")], "gpt-9")
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::UnknownModel(ref m) if m == "gpt-9"));
}

#[tokio::test]
async fn test_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(&[Message::user("Hello")], "llama-3.3-70b-versatile")
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::RateLimitExceeded));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(&[Message::user("Hello")], "llama-3.3-70b-versatile")
        .await
        .unwrap_err();

    assert!(matches!(
        EngineError::from(err),
        EngineError::BackendUnavailable(_)
    ));
}

#[tokio::test]
async fn test_connection_refused_is_unavailable() {
    let config = TextBackendConfig {
        base_url: "http://127.0.0.1:1/openai/v1".to_string(),
        request_timeout_secs: 5,
    };
    let provider = GroqProvider::new(&config, SecretString::new("gsk_test_key")).unwrap();

    let err = provider
        .complete(&[Message::user("Hello")], "llama-3.3-70b-versatile")
        .await
        .unwrap_err();

    assert!(err.is_unavailable(), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(&[Message::user("Hello")], "llama-3.3-70b-versatile")
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::ParseError(_)));
}

#[tokio::test]
async fn test_list_models() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/openai/v1/models"))
        .and(header("authorization", "Bearer gsk_test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "llama-3.3-70b-versatile", "object": "model", "owned_by": "Meta"},
                {"id": "whisper-large-v3", "object": "model", "owned_by": "OpenAI"}
            ]
        })))
        .mount(&server)
        .await;

    let models = provider(&server).list_models().await.unwrap();

    assert_eq!(models, vec!["llama-3.3-70b-versatile", "whisper-large-v3"]);
}
