//! Single entry point over the provider adapters.
//!
//! Exactly one adapter is selected at construction from configuration and
//! kept for the life of the process. Providers are never re-selected per
//! request, and adapter failures leave `generate` as one normalized error
//! shape.

#[cfg(feature = "embedded")]
use std::sync::Arc;

use crate::config::Config;
use crate::error::NoshError;
use crate::provider::hosted::HostedAdapter;
use crate::provider::local::LocalAdapter;
use crate::provider::GenRequest;

#[cfg(feature = "embedded")]
use crate::provider::embedded::EmbeddedAdapter;

/// One variant per backend. The selection happens once, in `from_config`.
enum Adapter {
    Hosted(HostedAdapter),
    Local(LocalAdapter),
    #[cfg(feature = "embedded")]
    Embedded(Arc<EmbeddedAdapter>),
}

pub struct Facade {
    adapter: Adapter,
    provider: &'static str,
    system_prompt: String,
    max_new_tokens: u32,
}

impl std::fmt::Debug for Facade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Facade")
            .field("provider", &self.provider)
            .field("max_new_tokens", &self.max_new_tokens)
            .finish_non_exhaustive()
    }
}

impl Facade {
    /// Validate the provider selector and build the one adapter it names.
    ///
    /// The unsupported-selector check runs before any adapter-specific work,
    /// so a typo in `MODEL_PROVIDER` never triggers a credential lookup or a
    /// model download.
    pub async fn from_config(config: &Config) -> Result<Self, NoshError> {
        let (adapter, provider) = match config.provider.as_str() {
            "openai" => (
                Adapter::Hosted(HostedAdapter::from_config(&config.openai)?),
                crate::provider::hosted::PROVIDER,
            ),
            "ollama" => (
                Adapter::Local(LocalAdapter::from_config(&config.ollama)?),
                crate::provider::local::PROVIDER,
            ),
            #[cfg(feature = "embedded")]
            "embedded" => {
                // Model load is heavy blocking work; keep it off the runtime.
                let embedded_config = config.embedded.clone();
                let adapter = tokio::task::spawn_blocking(move || {
                    EmbeddedAdapter::from_config(&embedded_config)
                })
                .await
                .map_err(|e| NoshError::InitFailed {
                    provider: crate::provider::embedded::PROVIDER,
                    message: format!("load task failed: {e}"),
                })??;
                (
                    Adapter::Embedded(Arc::new(adapter)),
                    crate::provider::embedded::PROVIDER,
                )
            }
            other => return Err(NoshError::UnsupportedProvider(other.to_string())),
        };

        tracing::info!(provider, "generation facade ready");

        Ok(Self {
            adapter,
            provider,
            system_prompt: config.system_prompt.clone(),
            max_new_tokens: config.max_new_tokens,
        })
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Generate a reply for one prompt. Adapter failures come back as a
    /// single `Generation` error carrying the underlying message.
    pub async fn generate(&self, prompt: &str) -> Result<String, NoshError> {
        let req = GenRequest {
            system_prompt: &self.system_prompt,
            prompt,
            max_new_tokens: self.max_new_tokens,
        };

        let result = match &self.adapter {
            Adapter::Hosted(adapter) => adapter.generate(&req).await,
            Adapter::Local(adapter) => adapter.generate(&req).await,
            #[cfg(feature = "embedded")]
            Adapter::Embedded(adapter) => {
                let adapter = Arc::clone(adapter);
                let system_prompt = self.system_prompt.clone();
                let prompt = prompt.to_string();
                let max_new_tokens = self.max_new_tokens;
                tokio::task::spawn_blocking(move || {
                    adapter.generate_blocking(&GenRequest {
                        system_prompt: &system_prompt,
                        prompt: &prompt,
                        max_new_tokens,
                    })
                })
                .await
                .map_err(|e| NoshError::Generation {
                    provider: crate::provider::embedded::PROVIDER,
                    message: format!("generation task failed: {e}"),
                })?
            }
        };

        result.map_err(|e| self.normalize(e))
    }

    /// Collapse adapter errors into one shape for callers. The full error
    /// text goes to the log here; the message callers see is the
    /// client-safe one.
    fn normalize(&self, err: NoshError) -> NoshError {
        match err {
            already @ NoshError::Generation { .. } => already,
            other => {
                tracing::warn!(provider = self.provider, error = %other, "adapter call failed");
                NoshError::Generation {
                    provider: self.provider,
                    message: other.user_message(),
                }
            }
        }
    }
}
