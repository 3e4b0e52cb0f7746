//! Request orchestration: validate, generate, guard.

use tokio::sync::OnceCell;

use crate::config::Config;
use crate::error::NoshError;
use crate::guard;
use crate::provider::Facade;

/// Process-wide chat service. Owns the configuration and the lazily built
/// generation facade.
///
/// The facade is created on the first request, not at boot — a missing
/// credential for the selected provider should fail that provider's
/// requests, not prevent the process from starting.
pub struct ChatService {
    config: Config,
    facade: OnceCell<Facade>,
}

impl ChatService {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            facade: OnceCell::new(),
        }
    }

    /// Handle one prompt end to end.
    ///
    /// Empty prompts are rejected before the facade is touched. The first
    /// caller builds the facade; `OnceCell` serializes concurrent first
    /// calls so exactly one adapter is ever constructed, and a failed build
    /// leaves the cell empty so a later request can retry.
    pub async fn handle(&self, prompt: &str) -> Result<String, NoshError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(NoshError::EmptyPrompt);
        }

        let facade = self
            .facade
            .get_or_try_init(|| async {
                tracing::info!("initializing model backend");
                let facade = Facade::from_config(&self.config).await?;
                tracing::info!(provider = facade.provider(), "model backend ready");
                Ok::<_, NoshError>(facade)
            })
            .await?;

        let mut response = facade.generate(prompt).await?;

        // Meal guard: only for food-related prompts, and only when the reply
        // looks broken. An off-topic prompt keeps whatever came back.
        if guard::mentions_food(prompt) && guard::looks_derailed(&response) {
            tracing::warn!("derailed meal reply, substituting fallback");
            response = guard::meal_fallback();
        }

        Ok(response)
    }

    /// Whether the facade has been built (for tests).
    pub fn initialized(&self) -> bool {
        self.facade.initialized()
    }
}
