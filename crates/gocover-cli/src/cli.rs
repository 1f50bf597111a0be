use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::commands::{list::ListTestsArgs, test::TestArgs};

/// gocover: run `go test` across packages and gate on results and coverage
///
/// One command, one verdict: which packages passed, failed, had no tests,
/// and whether each met the required coverage.
#[derive(Parser, Debug)]
#[command(name = "gocover", version, about, long_about = None)]
pub struct Cli {
    /// Increase output verbosity (stream per-test output, print a package table)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a config file (defaults to ./gocover.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to a daily-rotated file in this directory instead of stderr
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Verbosity level resolved from --verbose / --quiet flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// --quiet: only errors and passthrough output
    Quiet,
    /// default: normal output
    Normal,
    /// --verbose: per-test output and a package table
    Verbose,
}

impl Cli {
    /// Resolve the verbosity level from CLI flags
    pub fn verbosity(&self) -> Verbosity {
        match (self.quiet, self.verbose) {
            (true, _) => Verbosity::Quiet,
            (_, true) => Verbosity::Verbose,
            _ => Verbosity::Normal,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run `go test` and check results and coverage for every package
    Test(TestArgs),

    /// List test function names found in `*_test.go` files
    ListTests(ListTestsArgs),

    /// Generate shell completion scripts
    Completion(CompletionArgs),
}

/// Arguments for the `completion` command
#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_verbosity_resolution() {
        let cli = Cli::parse_from(["gocover", "-v", "test"]);
        assert_eq!(cli.verbosity(), Verbosity::Verbose);
        let cli = Cli::parse_from(["gocover", "test", "--quiet"]);
        assert_eq!(cli.verbosity(), Verbosity::Quiet);
        let cli = Cli::parse_from(["gocover", "test"]);
        assert_eq!(cli.verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["gocover", "-q", "-v", "test"]).is_err());
    }
}
