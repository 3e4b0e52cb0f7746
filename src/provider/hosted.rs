//! Hosted OpenAI-compatible chat-completions backend.

use reqwest::Client;
use serde::Deserialize;

use crate::config::OpenAiConfig;
use crate::error::NoshError;
use crate::provider::{GenRequest, Sampling};
use crate::sanitize;

pub const PROVIDER: &str = "openai";

pub struct HostedAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl HostedAdapter {
    /// Fails with `MissingCredential` when no API key is configured.
    /// No network traffic happens here — the first call does.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, NoshError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(NoshError::MissingCredential {
                provider: PROVIDER,
                variable: "OPENAI_API_KEY",
            })?;

        let client = Client::builder().build().map_err(|e| NoshError::InitFailed {
            provider: PROVIDER,
            message: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// One chat-completion call, no internal retries. Retry policy, if any,
    /// belongs to the caller.
    pub async fn generate(&self, req: &GenRequest<'_>) -> Result<String, NoshError> {
        let sampling = Sampling::hosted();
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": req.system_prompt},
                {"role": "user", "content": req.prompt},
            ],
            "temperature": sampling.temperature,
            "top_p": sampling.top_p,
            "max_tokens": req.max_new_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| NoshError::SchemaParse(format!("failed to parse response: {e}")))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| NoshError::Upstream {
                provider: PROVIDER,
                message: "empty choices or null content".to_string(),
                status: None,
            })?;

        Ok(sanitize::clean(&text))
    }
}
