use anyhow::{anyhow, Result};
use log::debug;

use crate::config::{Backend, Config};
use crate::llm::ollama::OllamaClient;
use crate::llm::openai::OpenAiClient;
use crate::llm::{LlmClient, NoopClient};

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com";
const OLLAMA_DEFAULT_BASE: &str = "http://localhost:11434";

/// Build the LLM client based on the resolved config.
pub fn build_llm_client(cfg: &Config) -> Result<Box<dyn LlmClient>> {
    match cfg.backend {
        Backend::None => {
            debug!("Using NoopClient (no model calls)");
            Ok(Box::new(NoopClient))
        }
        Backend::Ollama => {
            let base = if cfg.api_base_url == OPENAI_DEFAULT_BASE {
                OLLAMA_DEFAULT_BASE
            } else {
                cfg.api_base_url.as_str()
            };
            debug!("Using OllamaClient at {base} with model: {}", cfg.model);
            Ok(Box::new(OllamaClient::new(base, cfg.model.clone(), cfg.stream)?))
        }
        Backend::OpenAi => {
            let key = cfg.openai_api_key.clone().ok_or_else(|| {
                anyhow!("OPENAI_API_KEY (or --api-key) is required unless --no-model or model=none is used")
            })?;
            debug!("Using OpenAiClient with model: {}", cfg.model);
            Ok(Box::new(OpenAiClient::new(
                key,
                cfg.model.clone(),
                cfg.api_base_url.clone(),
                cfg.stream,
            )?))
        }
    }
}
