use thiserror::Error;

#[derive(Debug, Error)]
pub enum NoshError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("missing credential for {provider}: {variable} not set")]
    MissingCredential {
        provider: &'static str,
        variable: &'static str,
    },

    #[error("init failed for {provider}: {message}")]
    InitFailed {
        provider: &'static str,
        message: String,
    },

    #[error("upstream error from {provider}: {message}")]
    Upstream {
        provider: &'static str,
        message: String,
        status: Option<u16>,
    },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation failed via {provider}: {message}")]
    Generation {
        provider: &'static str,
        message: String,
    },
}

impl NoshError {
    /// True for errors raised before the facade exists — configuration and
    /// adapter-construction failures. These map to "Model init failed" at
    /// the HTTP boundary; everything after init is a generation failure.
    pub fn is_init(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedProvider(_)
                | Self::MissingCredential { .. }
                | Self::InitFailed { .. }
        )
    }

    /// Extract provider name from structured error variants.
    /// Returns None for variants that don't carry provider context.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::MissingCredential { provider, .. } => Some(provider),
            Self::InitFailed { provider, .. } => Some(provider),
            Self::Upstream { provider, .. } => Some(provider),
            Self::Generation { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Produce an error message safe for returning to HTTP clients.
    /// Does not leak base URLs or credentials.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyPrompt => "Prompt required".to_string(),
            Self::UnsupportedProvider(p) => format!("unknown MODEL_PROVIDER: {p}"),
            Self::MissingCredential { provider, variable } => {
                format!("{variable} not set for provider {provider}")
            }
            Self::InitFailed { provider, message } => {
                format!("failed to initialize {provider}: {message}")
            }
            Self::Upstream {
                provider, message, ..
            } => {
                format!("upstream error from {provider}: {message}")
            }
            Self::SchemaParse(_) => "failed to parse provider response".to_string(),
            Self::Request(_) => "request to provider failed".to_string(),
            Self::Generation { provider, message } => {
                format!("{provider}: {message}")
            }
        }
    }
}
