//! In-process model backend via candle.
//!
//! Loads a Qwen2-family instruct model and its tokenizer once at
//! construction, then serves generations from the same process. CUDA with
//! F16 weights when available, otherwise CPU with F32. Generation is pure
//! compute, so the facade runs it on the blocking pool.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::qwen2::{Config as Qwen2Config, ModelForCausalLM};
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;

use crate::config::EmbeddedConfig;
use crate::error::NoshError;
use crate::provider::{GenRequest, Sampling};
use crate::sanitize;

pub const PROVIDER: &str = "embedded";

/// Penalty window: only the most recent tokens feed the repetition penalty.
const REPEAT_LAST_N: usize = 128;

/// Early-exit strings checked against the decoded generation in progress.
/// The sanitizer still post-processes whatever came out.
const STOP: &[&str] = &["User:", "Assistant:", "###", "Customer:", "Associate:"];

pub struct EmbeddedAdapter {
    /// KV cache needs `&mut`, so the model sits behind a mutex. One
    /// generation at a time — this backend is a dev/offline path, not a
    /// throughput play.
    model: Mutex<ModelForCausalLM>,
    tokenizer: Tokenizer,
    device: Device,
    eos_token_id: u32,
    chat_template: bool,
}

impl EmbeddedAdapter {
    /// Download (or hit the local hub cache for) config, weights, and
    /// tokenizer, then load the model. This is the expensive once-per-process
    /// step; callers should run it on the blocking pool.
    pub fn from_config(config: &EmbeddedConfig) -> Result<Self, NoshError> {
        let model_id = config.model_id.as_str();
        tracing::info!(model_id, "loading embedded model");

        let api = Api::new().map_err(|e| init_err(format!("hub api: {e}")))?;
        let repo = api.model(model_id.to_string());

        let config_file = repo
            .get("config.json")
            .map_err(|e| init_err(format!("config.json: {e}")))?;
        let tokenizer_file = repo
            .get("tokenizer.json")
            .map_err(|e| init_err(format!("tokenizer.json: {e}")))?;
        let weight_files = fetch_weights(&repo)?;

        let device = Device::cuda_if_available(0)
            .map_err(|e| init_err(format!("device selection: {e}")))?;
        let dtype = if device.is_cuda() { DType::F16 } else { DType::F32 };
        tracing::info!(?device, ?dtype, "embedded device selected");

        let tokenizer = Tokenizer::from_file(&tokenizer_file)
            .map_err(|e| init_err(format!("tokenizer: {e}")))?;

        // tokenizer_config.json carries the eos token and the chat template.
        // Both are optional; we fall back to Qwen conventions.
        let tokenizer_config: serde_json::Value = repo
            .get("tokenizer_config.json")
            .ok()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        let eos_token_id = eos_from(&tokenizer_config, &tokenizer);
        let chat_template = tokenizer_config.get("chat_template").is_some();

        let model_config: Qwen2Config = serde_json::from_str(
            &std::fs::read_to_string(&config_file)
                .map_err(|e| init_err(format!("read config: {e}")))?,
        )
        .map_err(|e| init_err(format!("parse config: {e}")))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&weight_files, dtype, &device)
                .map_err(|e| init_err(format!("load weights: {e}")))?
        };
        let model = ModelForCausalLM::new(&model_config, vb)
            .map_err(|e| init_err(format!("build model: {e}")))?;

        tracing::info!(model_id, "embedded model ready");

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            eos_token_id,
            chat_template,
        })
    }

    /// Build the prompt the way the model was tuned to see it: ChatML when
    /// the tokenizer ships a chat template, a minimal textual turn otherwise.
    fn format_prompt(&self, system_prompt: &str, prompt: &str) -> String {
        if self.chat_template {
            format!(
                "<|im_start|>system\n{system_prompt}<|im_end|>\n\
                 <|im_start|>user\n{prompt}<|im_end|>\n\
                 <|im_start|>assistant\n"
            )
        } else {
            format!("User: {prompt}\nAssistant:")
        }
    }

    pub fn generate_blocking(&self, req: &GenRequest<'_>) -> Result<String, NoshError> {
        let sampling = Sampling::embedded();
        let text = self.format_prompt(req.system_prompt, req.prompt);

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| gen_err(format!("encode: {e}")))?;
        let mut tokens: Vec<u32> = encoding.get_ids().to_vec();
        let prompt_len = tokens.len();
        if prompt_len == 0 {
            return Err(gen_err("empty prompt after tokenization".to_string()));
        }

        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(299_792_458);
        let mut logits_processor = LogitsProcessor::new(
            seed,
            Some(sampling.temperature),
            Some(sampling.top_p),
        );
        let repeat_penalty = sampling.repeat_penalty.unwrap_or(1.0) as f32;

        let mut model = self
            .model
            .lock()
            .map_err(|e| gen_err(format!("model lock poisoned: {e}")))?;
        model.clear_kv_cache();

        for index in 0..req.max_new_tokens as usize {
            // First pass feeds the whole prompt; afterwards one token at a
            // time against the KV cache.
            let context_size = if index == 0 { tokens.len() } else { 1 };
            let start_pos = tokens.len().saturating_sub(context_size);
            let input = Tensor::new(&tokens[start_pos..], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(|e| gen_err(format!("input tensor: {e}")))?;

            let logits = model
                .forward(&input, start_pos)
                .and_then(|l| l.squeeze(0))
                .and_then(|l| l.squeeze(0))
                .and_then(|l| l.to_dtype(DType::F32))
                .map_err(|e| gen_err(format!("forward: {e}")))?;

            let logits = if repeat_penalty == 1.0 {
                logits
            } else {
                let start_at = tokens.len().saturating_sub(REPEAT_LAST_N);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    repeat_penalty,
                    &tokens[start_at..],
                )
                .map_err(|e| gen_err(format!("repeat penalty: {e}")))?
            };

            let next = logits_processor
                .sample(&logits)
                .map_err(|e| gen_err(format!("sample: {e}")))?;
            tokens.push(next);

            if next == self.eos_token_id {
                break;
            }

            let generated = self.decode(&tokens[prompt_len..])?;
            if STOP.iter().any(|s| generated.contains(s)) {
                break;
            }
        }

        // Decode only the newly generated span — the prompt never reaches
        // the caller.
        let out = truncate_at_stop(self.decode(&tokens[prompt_len..])?);
        Ok(sanitize::clean(out.trim()))
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, NoshError> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|e| gen_err(format!("decode: {e}")))
    }
}

/// Single-file models ship `model.safetensors`; larger ones carry an index
/// mapping tensors to shards.
fn fetch_weights(repo: &hf_hub::api::sync::ApiRepo) -> Result<Vec<PathBuf>, NoshError> {
    if let Ok(single) = repo.get("model.safetensors") {
        return Ok(vec![single]);
    }

    let index_file = repo
        .get("model.safetensors.index.json")
        .map_err(|e| init_err(format!("no model weights found: {e}")))?;
    let index: serde_json::Value = std::fs::read_to_string(&index_file)
        .map_err(|e| init_err(format!("read weight index: {e}")))
        .and_then(|s| {
            serde_json::from_str(&s).map_err(|e| init_err(format!("parse weight index: {e}")))
        })?;

    let mut shards: Vec<String> = index["weight_map"]
        .as_object()
        .map(|m| m.values().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    shards.sort();
    shards.dedup();
    if shards.is_empty() {
        return Err(init_err("weight index has no shards".to_string()));
    }

    shards
        .iter()
        .map(|name| {
            repo.get(name)
                .map_err(|e| init_err(format!("shard {name}: {e}")))
        })
        .collect()
}

/// Resolve the eos token id: tokenizer_config's `eos_token` (string or
/// `{"content": ...}` object), falling back to Qwen's `<|im_end|>`, then
/// `<|endoftext|>`, then the Qwen2 default id.
fn eos_from(tokenizer_config: &serde_json::Value, tokenizer: &Tokenizer) -> u32 {
    let configured = match &tokenizer_config["eos_token"] {
        serde_json::Value::String(s) => Some(s.clone()),
        obj @ serde_json::Value::Object(_) => {
            obj["content"].as_str().map(String::from)
        }
        _ => None,
    };

    configured
        .and_then(|t| tokenizer.token_to_id(&t))
        .or_else(|| tokenizer.token_to_id("<|im_end|>"))
        .or_else(|| tokenizer.token_to_id("<|endoftext|>"))
        .unwrap_or(151643)
}

/// Cut the decoded span at the first stop string. The generation loop breaks
/// once a stop appears, but the decoded text still carries it, and the
/// sanitizer only truncates newline-prefixed turn markers — a mid-line
/// `User:` fragment must be dropped here.
fn truncate_at_stop(mut text: String) -> String {
    if let Some(cut) = STOP.iter().filter_map(|s| text.find(s)).min() {
        text.truncate(cut);
    }
    text
}

fn init_err(message: String) -> NoshError {
    NoshError::InitFailed {
        provider: PROVIDER,
        message,
    }
}

fn gen_err(message: String) -> NoshError {
    NoshError::Generation {
        provider: PROVIDER,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_line_stop_fragment_is_truncated() {
        let text = "Try the lentil soup. User: what else".to_string();
        assert_eq!(truncate_at_stop(text), "Try the lentil soup. ");
    }

    #[test]
    fn earliest_stop_wins() {
        let text = "Soup.###extra Assistant: more".to_string();
        assert_eq!(truncate_at_stop(text), "Soup.");
    }

    #[test]
    fn text_without_stop_is_unchanged() {
        let text = "Beans and rice with salsa.".to_string();
        assert_eq!(truncate_at_stop(text.clone()), text);
    }

    #[test]
    fn eos_falls_back_to_qwen_default_without_tokenizer_hits() {
        // An empty tokenizer knows none of the candidate tokens.
        let tokenizer = Tokenizer::new(tokenizers::models::bpe::BPE::default());
        let config = serde_json::json!({});
        assert_eq!(eos_from(&config, &tokenizer), 151643);
    }

    #[test]
    fn eos_token_object_form_is_read() {
        let tokenizer = Tokenizer::new(tokenizers::models::bpe::BPE::default());
        let config = serde_json::json!({"eos_token": {"content": "<|im_end|>"}});
        // Token unknown to the empty tokenizer, so the chain still lands on
        // the default — the point is that the object form doesn't panic.
        assert_eq!(eos_from(&config, &tokenizer), 151643);
    }
}
