use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

/// How the runner was invoked, and therefore how each unit of output is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `go test -json` event per line.
    #[default]
    Json,
    /// Plain `go test` text output, one line per unit.
    Text,
}

/// Terminal result reported for a package by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// One normalized fact extracted from a unit of runner output.
///
/// `origin` is the evidence text kept for conflict diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Outcome {
        package: String,
        outcome: Outcome,
        origin: String,
    },
    NoTestFiles {
        package: String,
        origin: String,
    },
    Coverage {
        package: String,
        percent: f64,
        origin: String,
    },
    /// Text to mirror on stdout verbatim.
    Passthrough(String),
    Ignored,
    /// A package-scoped action outside the protocol.
    UnknownAction { package: String, action: String },
}

/// Matches `ok <pkg> ... coverage: NN.NN% of statements`.
///
/// Captures: (1) package, (2) percentage.
pub static COVERAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // safety: this regex is valid and tested
    Regex::new(r"^ok\s+(\S+)\s.*coverage: +([0-9]+\.[0-9]+)% of statements\r?\n?$")
        .expect("valid regex")
});

/// Matches `? <pkg> [no test files]`. Captures: (1) package.
pub static NO_TEST_FILES_RE: LazyLock<Regex> = LazyLock::new(|| {
    // safety: this regex is valid and tested
    Regex::new(r"^\?\s+(\S+).*\[no test files\]\r?\n?$").expect("valid regex")
});

/// Matches `FAIL <pkg> ...`. Captures: (1) package.
///
/// A bare `FAIL` summary line carries no package and does not match.
pub static FAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // safety: this regex is valid and tested
    Regex::new(r"^FAIL\s+(\S+)").expect("valid regex")
});

/// A single `go test -json` event. Go emits capitalized field names.
#[derive(Debug, Default, Deserialize)]
struct GoTestEvent {
    #[serde(rename = "Action", alias = "action", default)]
    action: String,
    #[serde(rename = "Package", alias = "package", default)]
    package: String,
    #[serde(rename = "Test", alias = "test", default)]
    test: String,
    #[serde(rename = "Output", alias = "output", default)]
    output: String,
}

/// Turns units of runner output into [`Observation`]s for one run.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    format: OutputFormat,
    verbose: bool,
}

impl Classifier {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Classify one unit: a JSON event in [`OutputFormat::Json`], a line in
    /// [`OutputFormat::Text`].
    ///
    /// Passthrough text always precedes the fact derived from the same unit,
    /// so it is shown even when applying the fact fails.
    pub fn classify(&self, unit: &str) -> Result<Vec<Observation>> {
        match self.format {
            OutputFormat::Json => classify_event(unit, self.verbose),
            OutputFormat::Text => Ok(classify_line(unit)),
        }
    }
}

/// Classify one `go test -json` event.
///
/// Test-scoped output is only surfaced when `verbose` is set; every other
/// test-scoped action is ignored.
pub fn classify_event(raw: &str, verbose: bool) -> Result<Vec<Observation>> {
    let event: GoTestEvent = serde_json::from_str(raw).map_err(|source| Error::MalformedEvent {
        raw: raw.to_string(),
        source,
    })?;

    if !event.test.is_empty() {
        if verbose && event.action == "output" {
            return Ok(vec![Observation::Passthrough(event.output)]);
        }
        return Ok(vec![Observation::Ignored]);
    }

    let observation = match event.action.as_str() {
        "pass" | "success" => Observation::Outcome {
            package: event.package,
            outcome: Outcome::Success,
            origin: event.action,
        },
        "fail" | "failure" => Observation::Outcome {
            package: event.package,
            outcome: Outcome::Failure,
            origin: event.action,
        },
        "output" => return classify_package_output(event.package, event.output),
        "build-output" => Observation::Passthrough(event.output),
        "skip" | "start" | "build-fail" => Observation::Ignored,
        _ => Observation::UnknownAction {
            package: event.package,
            action: event.action,
        },
    };
    Ok(vec![observation])
}

fn classify_package_output(package: String, output: String) -> Result<Vec<Observation>> {
    let origin = output.trim().to_string();

    if let Some(caps) = NO_TEST_FILES_RE.captures(&output) {
        let package = or_captured(package, &caps[1]);
        return Ok(vec![
            Observation::Passthrough(output),
            Observation::NoTestFiles { package, origin },
        ]);
    }

    if let Some(caps) = COVERAGE_RE.captures(&output) {
        let package = or_captured(package, &caps[1]);
        let percent = parse_percent(&package, &caps[2])?;
        return Ok(vec![
            Observation::Passthrough(output),
            Observation::Coverage {
                package,
                percent,
                origin,
            },
        ]);
    }

    Ok(vec![Observation::Passthrough(output)])
}

/// Classify one line of plain `go test` output.
///
/// Every line is echoed. Patterns are tried in priority order: no test
/// files, coverage, failure. Anything else is harmless passthrough.
pub fn classify_line(line: &str) -> Vec<Observation> {
    let line = line.trim_end_matches(['\r', '\n']);
    let echo = Observation::Passthrough(format!("{line}\n"));
    let origin = line.trim().to_string();

    let fact = if let Some(caps) = NO_TEST_FILES_RE.captures(line) {
        Some(Observation::NoTestFiles {
            package: caps[1].to_string(),
            origin,
        })
    } else if let Some(caps) = COVERAGE_RE.captures(line) {
        // The pattern only admits digits around a dot, so parsing cannot fail.
        caps[2].parse::<f64>().ok().map(|percent| Observation::Coverage {
            package: caps[1].to_string(),
            percent,
            origin,
        })
    } else {
        FAIL_RE.captures(line).map(|caps| Observation::Outcome {
            package: caps[1].to_string(),
            outcome: Outcome::Failure,
            origin,
        })
    };

    match fact {
        Some(fact) => vec![echo, fact],
        None => vec![echo],
    }
}

fn or_captured(package: String, captured: &str) -> String {
    if package.is_empty() {
        captured.to_string()
    } else {
        package
    }
}

fn parse_percent(package: &str, value: &str) -> Result<f64> {
    value.parse().map_err(|_| Error::MalformedCoverage {
        package: package.to_string(),
        value: value.to_string(),
    })
}
