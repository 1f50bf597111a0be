mod cli;
mod commands;
mod logging;
mod render;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use gocover_core::config::GocoverConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();
    let guard = logging::init(cli.log_dir.as_deref());

    // `completion` needs neither config nor a go toolchain
    if let Commands::Completion(args) = cli.command {
        clap_complete::generate(
            args.shell,
            &mut <Cli as clap::CommandFactory>::command(),
            "gocover",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let config_path = cli.config.clone();
    let result = match cli.command {
        Commands::Test(args) => match load_config(config_path.as_deref()) {
            Ok(config) => commands::test::run(args, config, verbosity).await,
            Err(e) => Err(e),
        },
        Commands::ListTests(args) => commands::list::run(args),
        Commands::Completion(_) => unreachable!("completion handled above"),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{} {}", "FAILED".red().bold(), e);
            // process::exit skips destructors; flush buffered logs first
            drop(guard);
            std::process::exit(1);
        }
    }
}

/// Load `--config`, or `gocover.yaml` from the working directory when present.
fn load_config(explicit: Option<&Path>) -> Result<GocoverConfig> {
    let cwd = std::env::current_dir()?;
    Ok(GocoverConfig::load(explicit, &cwd)?)
}
