use anyhow::Result;
use colored::{ColoredString, Colorize};

use gocover_core::aggregate::{PackageRecord, PackageStatus, Verdict};
use gocover_core::error::percent;

use crate::cli::Verbosity;

/// Report a verdict.
///
/// Every failure but the last is printed on stderr, one per line; the last
/// one is returned so it becomes the command's error. On success a summary
/// is printed unless `--quiet`.
pub fn report(verdict: Verdict, verbosity: Verbosity) -> Result<()> {
    if verbosity == Verbosity::Verbose {
        for line in package_table(&verdict.packages) {
            println!("{line}");
        }
    }

    let passed = verdict.count(PackageStatus::Success);
    let no_tests = verdict.count(PackageStatus::NoTestFiles);

    let Verdict { mut failures, .. } = verdict;
    let last = failures.pop();
    for failure in &failures {
        eprintln!("{failure}");
    }
    if let Some(err) = last {
        return Err(err.into());
    }

    if verbosity != Verbosity::Quiet {
        println!("\n{}", summary_line(passed, no_tests).green());
    }
    Ok(())
}

fn summary_line(passed: usize, no_tests: usize) -> String {
    if no_tests == 0 {
        format!("All {passed} package(s) passed.")
    } else {
        format!("All {passed} package(s) passed ({no_tests} without test files).")
    }
}

/// Width of the package name column.
const NAME_WIDTH: usize = 40;

/// One line per package: name, status, coverage.
fn package_table(packages: &[PackageRecord]) -> Vec<String> {
    packages
        .iter()
        .map(|pkg| {
            let coverage = pkg.coverage().map(percent).unwrap_or_default();
            format!(
                "  {:<width$} {:<8} {}",
                pkg.name,
                status_label(pkg.status()),
                coverage,
                width = NAME_WIDTH
            )
        })
        .collect()
}

fn status_label(status: PackageStatus) -> ColoredString {
    match status {
        PackageStatus::Success => "ok".green(),
        PackageStatus::Failure => "FAIL".red(),
        PackageStatus::NoTestFiles => "no tests".dimmed(),
        PackageStatus::Unset => "?".yellow(),
    }
}
