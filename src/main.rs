mod cli_args;
mod config;
mod git;
mod llm;
mod logging;
mod output;
mod run;
mod setup;
mod suggestions;

use anyhow::Result;
use clap::Parser;

use cli_args::Cli;
use config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logger(cli.verbose);

    let cfg = Config::from_sources(&cli);
    let llm = setup::build_llm_client(&cfg)?;

    run::run(&cli, &cfg, llm.as_ref())
}
