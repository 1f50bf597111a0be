use std::path::PathBuf;

/// Errors produced while running and judging a `go test` invocation.
///
/// Variants fall into two classes. Fatal errors (launch failures, malformed
/// or conflicting runner output, configuration problems) stop the pipeline
/// and are the only error surfaced. Verdict errors are per-package judgments
/// discovered at finalize time; every one of them is reported, but only the
/// last is returned as the run's error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to execute shell command: {0}")]
    Launch(#[source] std::io::Error),

    #[error("failed to create temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("go test exited with status {}", exit_status(.code))]
    RunnerExit { code: Option<i32> },

    #[error("failed to parse go event ({raw}): {source}")]
    MalformedEvent {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse coverage value {value:?} for package {package}")]
    MalformedCoverage { package: String, value: String },

    #[error("Unknown package event action: {action:?}")]
    UnknownAction { action: String },

    #[error("Duplicate package results for {package}: {previous}, {current}")]
    DuplicateResult {
        package: String,
        previous: String,
        current: String,
    },

    #[error("Duplicate package coverage for {package}: {previous:?}, {current:?}")]
    DuplicateCoverage {
        package: String,
        previous: String,
        current: String,
    },

    #[error("Cannot set func-filter and min coverage flags simultaneously")]
    ConflictingFlags,

    #[error("Expected {expected} package(s), but found {}: {}", .observed.len(), join_names(.observed))]
    PackageCountMismatch {
        expected: usize,
        observed: Vec<String>,
    },

    #[error("Tests failed for package: {package}")]
    TestsFailed { package: String },

    #[error("No coverage set for package: {package}")]
    MissingCoverage { package: String },

    #[error("Coverage of package {package:?} ({}) must be at least {}", percent_of(.coverage), percent_of(.minimum))]
    CoverageBelowThreshold {
        package: String,
        coverage: f64,
        minimum: f64,
    },

    #[error("invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error halts stream processing and replaces the verdict.
    ///
    /// Per-package verdict errors are the only non-fatal kind.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::TestsFailed { .. }
                | Error::MissingCoverage { .. }
                | Error::CoverageBelowThreshold { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Format a coverage percentage with one decimal place, e.g. `54.3%`.
pub fn percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn percent_of(value: &f64) -> String {
    percent(*value)
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

fn join_names(names: &[String]) -> String {
    names.join(", ")
}
