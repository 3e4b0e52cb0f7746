//! Thin HTTP surface over the chat service.
//!
//! One operation: POST /chat with a prompt, get back either
//! `{"prompt", "response"}` or `{"error", "detail"}`. Everything with logic
//! lives below the handler; this file is routing and status mapping.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use crate::error::NoshError;
use crate::handler::ChatService;

#[derive(Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    prompt: String,
}

pub fn router(service: Arc<ChatService>) -> Router {
    Router::new()
        .route("/chat", get(chat_info).post(chat))
        .with_state(service)
}

async fn chat_info() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Chatbot API is running! POST a prompt to this endpoint."
    }))
}

async fn chat(
    State(service): State<Arc<ChatService>>,
    Json(body): Json<ChatBody>,
) -> Response {
    let prompt = body.prompt.trim().to_string();

    match service.handle(&prompt).await {
        Ok(response) => (
            StatusCode::OK,
            Json(json!({ "prompt": prompt, "response": response })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: NoshError) -> Response {
    match &e {
        NoshError::EmptyPrompt => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Prompt required" })),
        )
            .into_response(),
        _ if e.is_init() => {
            tracing::error!(error = %e, "model init failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Model init failed", "detail": e.user_message() })),
            )
                .into_response()
        }
        _ => {
            tracing::error!(error = %e, "generate failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Generate failed", "detail": e.user_message() })),
            )
                .into_response()
        }
    }
}

/// Bind and serve until ctrl-c.
pub async fn serve(service: Arc<ChatService>, bind: &str) -> anyhow::Result<()> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received shutdown signal");
        })
        .await?;

    Ok(())
}
