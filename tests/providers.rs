//! Adapter and facade tests against fake HTTP backends.

use mockito::Matcher;
use serde_json::json;

use nosh::config::{Config, EmbeddedConfig, OllamaConfig, OpenAiConfig};
use nosh::error::NoshError;
use nosh::provider::hosted::HostedAdapter;
use nosh::provider::local::LocalAdapter;
use nosh::provider::{Facade, GenRequest};

fn base_config() -> Config {
    Config {
        provider: "openai".to_string(),
        system_prompt: "You are a friendly nutrition assistant.".to_string(),
        max_new_tokens: 140,
        openai: OpenAiConfig {
            api_key: None,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
        },
        ollama: OllamaConfig {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "qwen2.5:3b-instruct".to_string(),
        },
        embedded: EmbeddedConfig {
            model_id: "Qwen/Qwen2.5-0.5B-Instruct".to_string(),
        },
        bind: "127.0.0.1:8000".to_string(),
    }
}

fn gen_request<'a>(prompt: &'a str, system: &'a str) -> GenRequest<'a> {
    GenRequest {
        system_prompt: system,
        prompt,
        max_new_tokens: 140,
    }
}

// ---------------------------------------------------------------------------
// Facade construction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_credential_fails_construction_without_network() {
    let mut config = base_config();
    config.openai.api_key = None;
    // Unroutable base URL — if construction tried the network this would hang
    // or error differently.
    config.openai.base_url = "http://192.0.2.1:1".to_string();

    let err = Facade::from_config(&config).await.unwrap_err();
    assert!(matches!(
        err,
        NoshError::MissingCredential {
            provider: "openai",
            variable: "OPENAI_API_KEY"
        }
    ));
}

#[tokio::test]
async fn unsupported_provider_fails_before_adapter_work() {
    let mut config = base_config();
    config.provider = "mainframe".to_string();
    // No credential configured either: the selector check must win.
    config.openai.api_key = None;

    let err = Facade::from_config(&config).await.unwrap_err();
    match err {
        NoshError::UnsupportedProvider(p) => assert_eq!(p, "mainframe"),
        other => panic!("expected UnsupportedProvider, got {other:?}"),
    }
}

#[tokio::test]
async fn facade_normalizes_adapter_failures() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body("model exploded")
        .create_async()
        .await;

    let mut config = base_config();
    config.provider = "ollama".to_string();
    config.ollama.base_url = server.url();

    let facade = Facade::from_config(&config).await.unwrap();
    let err = facade.generate("hello").await.unwrap_err();

    match err {
        NoshError::Generation { provider, message } => {
            assert_eq!(provider, "ollama");
            assert!(message.contains("500"), "message was: {message}");
        }
        other => panic!("expected Generation, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn transport_failure_is_normalized_and_sanitized() {
    let mut config = base_config();
    config.provider = "ollama".to_string();
    // Nothing listens on port 1 — the connection is refused immediately.
    config.ollama.base_url = "http://127.0.0.1:1".to_string();

    let facade = Facade::from_config(&config).await.unwrap();
    let err = facade.generate("hello").await.unwrap_err();

    match err {
        NoshError::Generation { provider, message } => {
            assert_eq!(provider, "ollama");
            // Transport detail (refused vs. timeout) goes to the server log;
            // the client-facing message stays generic.
            assert_eq!(message, "request to provider failed");
        }
        other => panic!("expected Generation, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Hosted adapter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hosted_sends_chat_completion_and_cleans_reply() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "llama-3.1-8b-instant",
            "temperature": 0.5,
            "top_p": 0.9,
            "max_tokens": 140,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{
                    "message": {
                        "content": "Try lentil soup.\nUser: more?\nAssistant: rice"
                    }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = HostedAdapter::from_config(&OpenAiConfig {
        api_key: Some("test-key".to_string()),
        base_url: server.url(),
        model: "llama-3.1-8b-instant".to_string(),
    })
    .unwrap();

    let text = adapter
        .generate(&gen_request("what should I eat?", "system"))
        .await
        .unwrap();

    // Turn leakage after the stop marker is stripped.
    assert_eq!(text, "Try lentil soup.");
    mock.assert_async().await;
}

#[tokio::test]
async fn hosted_maps_non_success_to_upstream() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let adapter = HostedAdapter::from_config(&OpenAiConfig {
        api_key: Some("test-key".to_string()),
        base_url: server.url(),
        model: "m".to_string(),
    })
    .unwrap();

    let err = adapter
        .generate(&gen_request("hi", "system"))
        .await
        .unwrap_err();

    match err {
        NoshError::Upstream {
            provider, status, ..
        } => {
            assert_eq!(provider, "openai");
            assert_eq!(status, Some(429));
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn hosted_rejects_malformed_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("not json at all")
        .create_async()
        .await;

    let adapter = HostedAdapter::from_config(&OpenAiConfig {
        api_key: Some("test-key".to_string()),
        base_url: server.url(),
        model: "m".to_string(),
    })
    .unwrap();

    let err = adapter
        .generate(&gen_request("hi", "system"))
        .await
        .unwrap_err();
    assert!(matches!(err, NoshError::SchemaParse(_)));
}

#[tokio::test]
async fn hosted_treats_null_content_as_upstream_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"choices": []}).to_string())
        .create_async()
        .await;

    let adapter = HostedAdapter::from_config(&OpenAiConfig {
        api_key: Some("test-key".to_string()),
        base_url: server.url(),
        model: "m".to_string(),
    })
    .unwrap();

    let err = adapter
        .generate(&gen_request("hi", "system"))
        .await
        .unwrap_err();
    assert!(matches!(err, NoshError::Upstream { status: None, .. }));
}

// ---------------------------------------------------------------------------
// Local adapter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_sends_options_and_returns_cleaned_content() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({
            "model": "qwen2.5:3b-instruct",
            "stream": false,
            "options": {
                "temperature": 0.25,
                "top_p": 0.85,
                "top_k": 40,
                "num_predict": 140,
            },
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "message": {"content": "Rice and beans.\nRice and beans.\nWith salsa."}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = LocalAdapter::from_config(&OllamaConfig {
        base_url: server.url(),
        model: "qwen2.5:3b-instruct".to_string(),
    })
    .unwrap();

    let text = adapter
        .generate(&gen_request("dinner ideas", "system"))
        .await
        .unwrap();

    // Adjacent duplicate lines collapse.
    assert_eq!(text, "Rice and beans.\nWith salsa.");
    mock.assert_async().await;
}

#[tokio::test]
async fn local_missing_content_becomes_empty_string() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"message": {}}).to_string())
        .create_async()
        .await;

    let adapter = LocalAdapter::from_config(&OllamaConfig {
        base_url: server.url(),
        model: "m".to_string(),
    })
    .unwrap();

    let text = adapter
        .generate(&gen_request("hi", "system"))
        .await
        .unwrap();
    assert_eq!(text, "");
}
