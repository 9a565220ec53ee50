use crate::cli_args::Cli;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Which chat backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    OpenAi,
    Ollama,
    None,
}

/// Final resolved configuration for reviewbot.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub openai_api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub stream: bool,

    /// Suggestions requested per model call (normal mode).
    pub num_code_suggestions: u32,
    /// Suggestions requested per chunk in extended mode.
    pub num_code_suggestions_per_chunk: u32,
    /// Ask for one-sentence summaries and print the grouped digest.
    pub summarize: bool,
    /// Extra review instructions forwarded verbatim to the model.
    pub extra_instructions: Option<String>,
    /// Rank suggestions with a second model call.
    pub rank_suggestions: bool,
    /// Enter extended mode automatically when the diff exceeds the token budget.
    pub auto_extended_mode: bool,
    /// Rough prompt-token budget per model call.
    pub max_model_tokens: u32,
    /// Upper bound on model calls in extended mode.
    pub max_number_of_calls: u32,
    /// After ranking, keep ceil(len * factor) suggestions.
    pub final_clip_factor: f32,
}

impl Config {
    /// Build the final config from CLI flags, environment, TOML file, and defaults.
    ///
    /// Precedence:
    ///   1. CLI flags (`--model`, `--num-suggestions`, ...)
    ///   2. Env vars `REVIEWBOT_MODEL`, `REVIEWBOT_API_BASE`, `OPENAI_API_KEY`
    ///   3. TOML `~/.config/reviewbot.toml`
    ///   4. Hardcoded defaults
    pub fn from_sources(cli: &Cli) -> Self {
        let file_cfg = load_file_config().unwrap_or_default();

        let model = cli
            .model
            .clone()
            .or_else(|| env::var("REVIEWBOT_MODEL").ok())
            .or(file_cfg.model)
            .unwrap_or_else(|| "gpt-4o-mini".to_string());

        let api_base_url = env::var("REVIEWBOT_API_BASE")
            .ok()
            .or(file_cfg.api_base)
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        let openai_api_key = cli
            .api_key
            .clone()
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .or(file_cfg.openai_api_key);

        let backend = if cli.no_model || model.eq_ignore_ascii_case("none") {
            Backend::None
        } else if file_cfg.backend.as_deref() == Some("ollama") {
            Backend::Ollama
        } else {
            Backend::OpenAi
        };

        Config {
            backend,
            openai_api_key,
            api_base_url,
            model,
            stream: file_cfg.stream.unwrap_or(false),
            num_code_suggestions: cli
                .num_suggestions
                .or(file_cfg.num_code_suggestions)
                .unwrap_or(4),
            num_code_suggestions_per_chunk: file_cfg
                .num_code_suggestions_per_chunk
                .unwrap_or(8),
            summarize: cli.summarize || file_cfg.summarize.unwrap_or(false),
            extra_instructions: cli
                .extra_instructions
                .clone()
                .or(file_cfg.extra_instructions),
            rank_suggestions: cli.rank || file_cfg.rank_suggestions.unwrap_or(false),
            auto_extended_mode: file_cfg.auto_extended_mode.unwrap_or(false),
            max_model_tokens: file_cfg.max_model_tokens.unwrap_or(32_000),
            max_number_of_calls: file_cfg.max_number_of_calls.unwrap_or(5),
            final_clip_factor: file_cfg.final_clip_factor.unwrap_or(0.9),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    /// Default model to use when not provided via CLI or env.
    pub model: Option<String>,
    pub openai_api_key: Option<String>,
    pub api_base: Option<String>,
    /// "openai" (default) or "ollama"
    pub backend: Option<String>,
    pub stream: Option<bool>,
    pub num_code_suggestions: Option<u32>,
    pub num_code_suggestions_per_chunk: Option<u32>,
    pub summarize: Option<bool>,
    pub extra_instructions: Option<String>,
    pub rank_suggestions: Option<bool>,
    pub auto_extended_mode: Option<bool>,
    pub max_model_tokens: Option<u32>,
    pub max_number_of_calls: Option<u32>,
    pub final_clip_factor: Option<f32>,
}

/// Return `~/.config/reviewbot.toml`
fn config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("reviewbot.toml"))
}

fn load_file_config() -> Option<FileConfig> {
    let path = config_path()?;
    if !path.exists() {
        return None;
    }

    let data = fs::read_to_string(&path).ok()?;
    toml::from_str::<FileConfig>(&data).ok()
}
