use std::env;

/// Default system prompt — keeps the model on the meal-suggestion rails.
/// Overridable via SYSTEM_PROMPT for experiments.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly nutrition assistant. \
If the user asks about food, first ask ONE short clarifying question (diet or craving). \
Then give EXACTLY 3 meal ideas: 1 quick, 1 budget, 1 healthy. \
Use bullets with emojis, 1 sentence each. Keep the whole reply under 100 words. \
Do not roleplay, do not include dates, names, file paths, or metadata.";

/// Immutable process-wide configuration, resolved once at startup.
///
/// The provider selector is kept as the raw string here; it is validated when
/// the facade is constructed, so a bad value surfaces on first use rather
/// than crashing the process at boot.
#[derive(Clone, Debug)]
pub struct Config {
    pub provider: String,
    pub system_prompt: String,
    pub max_new_tokens: u32,
    pub openai: OpenAiConfig,
    pub ollama: OllamaConfig,
    pub embedded: EmbeddedConfig,
    pub bind: String,
}

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct EmbeddedConfig {
    pub model_id: String,
}

impl Config {
    pub fn from_env() -> Self {
        let provider = env::var("MODEL_PROVIDER")
            .unwrap_or_else(|_| "openai".to_string())
            .to_lowercase();

        let max_new_tokens = env::var("MAX_NEW_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(140);

        let openai = OpenAiConfig {
            api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
            model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
        };

        let ollama = OllamaConfig {
            base_url: env::var("OLLAMA_BASE")
                .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string()),
            model: env::var("MODEL_NAME")
                .unwrap_or_else(|_| "qwen2.5:3b-instruct".to_string()),
        };

        let embedded = EmbeddedConfig {
            model_id: env::var("EMBEDDED_MODEL")
                .unwrap_or_else(|_| "Qwen/Qwen2.5-0.5B-Instruct".to_string()),
        };

        Config {
            provider,
            system_prompt: env::var("SYSTEM_PROMPT")
                .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_new_tokens,
            openai,
            ollama,
            embedded,
            bind: env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
        }
    }
}
