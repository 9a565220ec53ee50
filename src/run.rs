use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli_args::{Cli, Command};
use crate::config::{Backend, Config};
use crate::git;
use crate::llm::prompt_builder::{self, PromptVars};
use crate::llm::LlmClient;
use crate::output;
use crate::suggestions::{self, CodeSuggestion};

/// Reserved for the model's answer and for prompt-size estimation error.
const TOKEN_MARGIN: u32 = 512;

pub fn run(cli: &Cli, cfg: &Config, llm: &dyn LlmClient) -> Result<()> {
    let (diff, title, branch, description, commit_messages) = match &cli.command {
        Some(Command::Improve { base, from }) => {
            let from_branch = match from {
                Some(name) => name.clone(),
                None => git::current_branch()?,
            };
            log::info!("Reviewing {base}...{from_branch}");
            let diff = git::range_diff(base, &from_branch)?;
            let title = git::head_commit_subject(&from_branch)?;
            let description = git::head_commit_body(&from_branch)?;
            let messages = git::commit_messages(base, &from_branch)?;
            (diff, title, Some(from_branch), Some(description), Some(messages))
        }
        None => {
            log::info!("Reviewing the staged diff");
            let diff = git::staged_diff()?;
            let branch = git::current_branch()?;
            let title = format!("Staged changes on {branch}");
            (diff, title, Some(branch), None, None)
        }
    };

    let patches = git::split_into_file_patches(&diff);
    if patches.is_empty() {
        println!("No changes found to review.");
        return Ok(());
    }

    let language = git::main_language(&patches);
    log::info!(
        "Found {} changed file(s), main language: {}",
        patches.len(),
        language.as_deref().unwrap_or("unknown")
    );

    let annotated: Vec<String> = patches.iter().map(git::annotate_hunks).collect();

    let extended = cli.extended || cfg.auto_extended_mode;
    let base_vars = PromptVars {
        title,
        branch,
        description,
        language,
        diff: String::new(),
        num_code_suggestions: if extended {
            cfg.num_code_suggestions_per_chunk
        } else {
            cfg.num_code_suggestions
        },
        summarize_mode: cfg.summarize,
        extra_instructions: cfg.extra_instructions.clone(),
        commit_messages,
    };

    let budget = diff_token_budget(cfg, &base_vars);
    let chunks = if extended {
        let chunks = chunk_by_budget(&annotated, budget, cfg.max_number_of_calls as usize);
        log::info!("Extended mode: querying the model {} time(s)", chunks.len());
        chunks
    } else {
        vec![fit_to_budget(&annotated, budget)]
    };

    let mut collected: Vec<CodeSuggestion> = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if chunks.len() > 1 {
            log::info!("Processing chunk {} of {}", i + 1, chunks.len());
        }

        let mut vars = base_vars.clone();
        vars.diff = chunk.clone();
        let prompts = prompt_builder::code_suggestions_prompt(&vars);

        let spinner = start_spinner("Waiting for code suggestions...");
        let response = llm.complete(&prompts);
        spinner.finish_and_clear();

        let set = suggestions::parse_response(&response?)
            .context("failed to parse the model's suggestions")?;
        collected.extend(suggestions::validate(set));
    }

    if collected.is_empty() {
        println!("{}", output::NO_SUGGESTIONS);
        return Ok(());
    }

    if cfg.rank_suggestions && collected.len() > 1 && cfg.backend != Backend::None {
        log::info!("Ranking {} suggestions", collected.len());
        let prompts = prompt_builder::sort_suggestions_prompt(&collected);

        let spinner = start_spinner("Ranking suggestions...");
        let response = llm.complete(&prompts);
        spinner.finish_and_clear();

        collected = suggestions::apply_sort_order(collected, &response?);
        collected = suggestions::clip_ranked(
            collected,
            cfg.num_code_suggestions,
            cfg.num_code_suggestions_per_chunk,
            cfg.final_clip_factor,
        );
    }

    let report = if cfg.summarize {
        output::render_summarized(&collected)
    } else {
        output::render_inline(&collected)
    };

    println!();
    println!("{report}");

    Ok(())
}

fn start_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner());
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Rough chars/4 token estimate; good enough for chunking decisions.
fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32
}

/// Tokens left for the diff once the prompt skeleton and margin are paid for.
fn diff_token_budget(cfg: &Config, base_vars: &PromptVars) -> u32 {
    let empty = prompt_builder::code_suggestions_prompt(base_vars);
    let overhead = estimate_tokens(&empty.system) + estimate_tokens(&empty.user) + TOKEN_MARGIN;
    cfg.max_model_tokens.saturating_sub(overhead).max(256)
}

/// Normal mode: take annotated file patches in order until the budget is
/// spent; anything left over is reported and skipped.
fn fit_to_budget(annotated: &[String], budget: u32) -> String {
    let mut out = String::new();
    let mut used = 0;
    let mut skipped = 0;

    for file in annotated {
        let cost = estimate_tokens(file);
        if !out.is_empty() && used + cost > budget {
            skipped += 1;
            continue;
        }
        out.push_str(file);
        out.push_str("\n\n");
        used += cost;
    }

    if skipped > 0 {
        log::warn!("diff too large: skipped {skipped} file(s); consider --extended");
    }

    out.trim_end().to_string()
}

/// Extended mode: greedy chunking of annotated file patches under the budget,
/// capped at `max_calls` chunks.
fn chunk_by_budget(annotated: &[String], budget: u32, max_calls: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut used = 0;

    for file in annotated {
        let cost = estimate_tokens(file);
        if !current.is_empty() && used + cost > budget {
            chunks.push(current.trim_end().to_string());
            current = String::new();
            used = 0;
        }
        current.push_str(file);
        current.push_str("\n\n");
        used += cost;
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim_end().to_string());
    }

    if chunks.len() > max_calls {
        log::warn!(
            "diff needs {} chunks but max_number_of_calls is {max_calls}; dropping the rest",
            chunks.len()
        );
        chunks.truncate(max_calls);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_is_chars_over_four() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn fit_to_budget_skips_overflow_files() {
        let annotated = vec!["a".repeat(400), "b".repeat(400), "c".repeat(4)];
        // Budget of 110 tokens: first file (100) fits, second (100) does not,
        // the small third one still does.
        let out = fit_to_budget(&annotated, 110);
        assert!(out.contains(&annotated[0]));
        assert!(!out.contains(&annotated[1]));
        assert!(out.contains(&annotated[2]));
    }

    #[test]
    fn fit_to_budget_always_takes_the_first_file() {
        let annotated = vec!["x".repeat(4000)];
        let out = fit_to_budget(&annotated, 10);
        assert!(out.contains(&annotated[0]));
    }

    #[test]
    fn chunking_respects_budget_and_call_cap() {
        let annotated: Vec<String> = (0..6).map(|_| "x".repeat(400)).collect();
        // Each file is ~100 tokens; budget of 250 packs two per chunk.
        let chunks = chunk_by_budget(&annotated, 250, 5);
        assert_eq!(chunks.len(), 3);

        let capped = chunk_by_budget(&annotated, 100, 2);
        assert_eq!(capped.len(), 2);
    }
}
