pub mod openai;
pub mod ollama;
mod prompts;
pub mod prompt_builder;
mod stream;

use anyhow::Result;
use prompt_builder::PromptPair;

/// Trait for talking to an LLM (real backend).
pub trait LlmClient: Send + Sync {
    /// One chat-completion round trip: system + user prompt in, text out.
    fn complete(&self, prompts: &PromptPair) -> Result<String>;
}

/// No-op client for --no-model runs; answers every call with a canned
/// suggestion document so the full pipeline can be exercised offline.
pub struct NoopClient;

const CANNED_RESPONSE: &str = r#"code_suggestions:
- relevant_file: |-
    src/example.rs
  suggestion_content: |-
    Dummy suggestion produced without a model call
  existing_code: |-
    let value = compute().unwrap();
  improved_code: |-
    let value = compute()?;
  relevant_lines_start: 1
  relevant_lines_end: 1
  label: |-
    bug
"#;

impl LlmClient for NoopClient {
    fn complete(&self, _prompts: &PromptPair) -> Result<String> {
        Ok(CANNED_RESPONSE.to_string())
    }
}
