//! HTTP-level provider tests against a local mock server

use mockito::Matcher;
use reviewer_provider::{
    ChatParams, GeminiProvider, OpenAiProvider, Provider, ProviderError, Turn,
};

fn params(model: &str) -> ChatParams {
    ChatParams {
        model: model.to_string(),
        system: "rules".to_string(),
        turns: vec![Turn::requester_text("Review and fix this file: a.js")],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_gemini_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-test:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJsonString(
            r#"{"systemInstruction": {"parts": [{"text": "rules"}]}}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"candidates": [{"content": {"role": "model", "parts": [
                {"functionCall": {"name": "read_file", "args": {"file_path": "a.js"}}}
            ]}, "finishReason": "STOP"}]}"#,
        )
        .create_async()
        .await;

    let provider = GeminiProvider::new("test-key", Some(server.url()), None);
    let response = provider.chat(params("gemini-test")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].arguments["file_path"], "a.js");
}

#[tokio::test]
async fn test_gemini_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-test:generateContent")
        .with_status(429)
        .with_body(r#"{"error": {"message": "quota"}}"#)
        .create_async()
        .await;

    let provider = GeminiProvider::new("test-key", Some(server.url()), None);
    let err = provider.chat(params("gemini-test")).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_gemini_api_error_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-test:generateContent")
        .with_status(400)
        .with_body(r#"{"error": {"code": 400, "message": "API key not valid"}}"#)
        .create_async()
        .await;

    let provider = GeminiProvider::new("bad-key", Some(server.url()), None);
    match provider.chat(params("gemini-test")).await {
        Err(ProviderError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gemini_without_key_never_sends() {
    let provider = GeminiProvider::new("", Some("http://127.0.0.1:1".to_string()), None);
    let err = provider.chat(params("gemini-test")).await.unwrap_err();
    assert!(matches!(err, ProviderError::NoApiKey));
}

#[tokio::test]
async fn test_openai_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"choices": [{"message": {"role": "assistant", "content": "Looks fine"},
                "finish_reason": "stop"}]}"#,
        )
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-test", Some(server.url()), None);
    let response = provider.chat(params("gpt-4o")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.text.as_deref(), Some("Looks fine"));
    assert!(!response.has_tool_calls());
}

#[tokio::test]
async fn test_openai_server_error_is_retryable() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-test", Some(server.url()), None);
    let err = provider.chat(params("gpt-4o")).await.unwrap_err();
    match &err {
        ProviderError::Api { status, message } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    assert!(err.is_retryable());
}
