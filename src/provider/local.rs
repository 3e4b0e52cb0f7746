//! Local Ollama-style model server backend.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::OllamaConfig;
use crate::error::NoshError;
use crate::provider::{GenRequest, Sampling};
use crate::sanitize;

pub const PROVIDER: &str = "ollama";

/// Hard bound on a single generation call. Small local models on CPU can be
/// slow; anything past this is considered stuck.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Stop strings sent to the server so it cuts turn leakage at the source.
/// The sanitizer still runs afterwards as a second line of defense.
const STOP: &[&str] = &["User:", "Assistant:", "###", "Customer:", "Associate:"];

pub struct LocalAdapter {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatReply {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl LocalAdapter {
    pub fn from_config(config: &OllamaConfig) -> Result<Self, NoshError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NoshError::InitFailed {
                provider: PROVIDER,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub async fn generate(&self, req: &GenRequest<'_>) -> Result<String, NoshError> {
        let sampling = Sampling::local();
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": req.system_prompt},
                {"role": "user", "content": req.prompt},
            ],
            "stream": false,
            "options": {
                "temperature": sampling.temperature,
                "top_p": sampling.top_p,
                "top_k": sampling.top_k,
                "repeat_penalty": sampling.repeat_penalty,
                "repeat_last_n": 128,
                "presence_penalty": sampling.presence_penalty,
                "frequency_penalty": sampling.frequency_penalty,
                "num_predict": req.max_new_tokens,
                "stop": STOP,
            },
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NoshError::Upstream {
                provider: PROVIDER,
                message: format!("{status}: {text}"),
                status: Some(status.as_u16()),
            });
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| NoshError::SchemaParse(format!("failed to parse response: {e}")))?;

        let text = reply
            .message
            .and_then(|m| m.content)
            .unwrap_or_default();

        Ok(sanitize::clean(&text))
    }
}
