use clap::{ArgGroup, Parser, Subcommand};

/// CLI options
#[derive(Parser, Debug)]
#[command(
    name = "reviewbot",
    version,
    about = "LLM-assisted code review suggestions for your PR diffs"
)]
#[command(group(
    ArgGroup::new("model_group")
        .args(["model", "no_model"])
        .multiple(false)
))]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Model name to use (e.g. gpt-4o-mini). If 'none', acts like --no-model.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Disable model calls; return a canned response instead
    #[arg(long, global = true)]
    pub no_model: bool,

    /// API key (otherwise uses OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", global = true)]
    pub api_key: Option<String>,

    /// Maximum number of code suggestions to request from the model
    #[arg(long = "num-suggestions", global = true)]
    pub num_suggestions: Option<u32>,

    /// Ask for a one-sentence summary per suggestion and print a grouped digest
    #[arg(long, global = true)]
    pub summarize: bool,

    /// Extra review instructions passed verbatim to the model
    #[arg(long, global = true)]
    pub extra_instructions: Option<String>,

    /// Split large diffs into chunks and query the model once per chunk
    #[arg(long, global = true)]
    pub extended: bool,

    /// Rank suggestions by importance with a second model call
    #[arg(long, global = true)]
    pub rank: bool,

    /// Subcommand (e.g. 'improve')
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands, e.g. `reviewbot improve develop`
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate code suggestions for the commit range base..from
    Improve {
        /// Base branch to compare against (e.g. main or develop)
        base: String,

        /// Optional feature/source branch; defaults to current branch if omitted
        from: Option<String>,
    },
}
