use anyhow::Result;
use clap::Args;

use gocover_core::commands::list::discover_test_names;

/// Arguments for the `list-tests` command
#[derive(Args, Debug)]
pub struct ListTestsArgs {
    /// Path(s) to scan for `*_test.go` files (`./...` recurses)
    #[arg(default_value = ".")]
    pub paths: Vec<String>,

    /// Only list names starting with this prefix (case-insensitive)
    #[arg(long)]
    pub prefix: Option<String>,
}

/// Print distinct test function names, one per line, for use with `test -f`
pub fn run(args: ListTestsArgs) -> Result<()> {
    let names = discover_test_names(&args.paths, args.prefix.as_deref())?;
    tracing::debug!(count = names.len(), "discovered test functions");

    for name in names {
        println!("{name}");
    }
    Ok(())
}
