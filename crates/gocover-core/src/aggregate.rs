use std::collections::BTreeMap;
use std::io::Write;

use crate::classify::{Classifier, Observation, Outcome, OutputFormat};
use crate::error::{Error, Result};

/// What a package's output said about its tests, beyond pass/fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Report {
    NoTestFiles,
    Coverage(f64),
}

/// A one-shot fact together with the runner text that established it.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence<T> {
    pub value: T,
    pub origin: String,
}

/// Derived terminal state of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    Unset,
    Success,
    Failure,
    NoTestFiles,
}

/// Everything observed about one package during a run.
///
/// `result` and `report` are each written at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRecord {
    pub name: String,
    pub result: Option<Evidence<Outcome>>,
    pub report: Option<Evidence<Report>>,
}

impl PackageRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            result: None,
            report: None,
        }
    }

    pub fn status(&self) -> PackageStatus {
        match (
            self.result.as_ref().map(|e| e.value),
            self.report.as_ref().map(|e| e.value),
        ) {
            (Some(Outcome::Failure), _) => PackageStatus::Failure,
            (_, Some(Report::NoTestFiles)) => PackageStatus::NoTestFiles,
            (Some(Outcome::Success), _) | (None, Some(Report::Coverage(_))) => {
                PackageStatus::Success
            }
            (None, None) => PackageStatus::Unset,
        }
    }

    /// Recorded coverage percentage, if any.
    pub fn coverage(&self) -> Option<f64> {
        match self.report.as_ref().map(|e| e.value) {
            Some(Report::Coverage(value)) => Some(value),
            _ => None,
        }
    }
}

/// Whether and how coverage is judged at finalize time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverageGate {
    /// Coverage was not requested from the runner; only failures count.
    Disabled,
    /// Every successful package must report at least this percentage.
    Minimum(f64),
}

/// Final judgment of a run.
#[derive(Debug)]
pub struct Verdict {
    /// Package records in sorted name order.
    pub packages: Vec<PackageRecord>,
    /// Per-package verdict errors in sorted package order.
    pub failures: Vec<Error>,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The single error propagated for the run: the last failure evaluated.
    pub fn error(&self) -> Option<&Error> {
        self.failures.last()
    }

    /// Consume the verdict, returning the last failure as the run's error.
    pub fn into_result(mut self) -> Result<Vec<PackageRecord>> {
        match self.failures.pop() {
            Some(err) => Err(err),
            None => Ok(self.packages),
        }
    }

    pub fn count(&self, status: PackageStatus) -> usize {
        self.packages.iter().filter(|p| p.status() == status).count()
    }
}

/// Consumes the ordered output of one `go test` run and judges it.
///
/// Passthrough text is written to `out` as soon as it is classified. After
/// the first fatal error all further input is dropped; that error is kept
/// and returned by [`Aggregator::finish`].
pub struct Aggregator<W: Write> {
    classifier: Classifier,
    out: W,
    packages: BTreeMap<String, PackageRecord>,
    fatal: Option<Error>,
    failure_seen: bool,
}

impl<W: Write> Aggregator<W> {
    pub fn new(classifier: Classifier, out: W) -> Self {
        Self {
            classifier,
            out,
            packages: BTreeMap::new(),
            fatal: None,
            failure_seen: false,
        }
    }

    /// Consume one chunk of runner stdout, which may hold several units.
    ///
    /// Chunks are split on newlines and each unit is classified and applied
    /// in order. A single trailing newline ends the last unit rather than
    /// starting an empty one. Blank units carry nothing in JSON mode and are
    /// skipped.
    pub fn consume(&mut self, chunk: &str) {
        if self.fatal.is_some() {
            return;
        }

        let json = self.classifier.format() == OutputFormat::Json;
        let chunk = chunk.strip_suffix('\n').unwrap_or(chunk);
        for unit in chunk.split('\n') {
            if json && unit.trim().is_empty() {
                continue;
            }
            let result = self
                .classifier
                .classify(unit)
                .and_then(|observations| observations.into_iter().try_for_each(|o| self.apply(o)));
            if let Err(err) = result {
                tracing::debug!(error = %err, "stopping output processing");
                self.fatal = Some(err);
                return;
            }
        }
    }

    /// Apply one observation to the package state.
    pub fn apply(&mut self, observation: Observation) -> Result<()> {
        match observation {
            Observation::Outcome {
                package,
                outcome,
                origin,
            } => self.set_result(&package, outcome, origin),
            Observation::NoTestFiles { package, origin } => {
                self.set_report(&package, Report::NoTestFiles, origin)
            }
            Observation::Coverage {
                package,
                percent,
                origin,
            } => self.set_report(&package, Report::Coverage(percent), origin),
            Observation::Passthrough(text) => {
                if !text.is_empty() {
                    self.out.write_all(text.as_bytes())?;
                    self.out.flush()?;
                }
                Ok(())
            }
            Observation::Ignored => Ok(()),
            Observation::UnknownAction { action, .. } => Err(Error::UnknownAction { action }),
        }
    }

    fn set_result(&mut self, package: &str, outcome: Outcome, origin: String) -> Result<()> {
        let record = record_mut(&mut self.packages, package);

        // No-test-files settles the outcome, and a coverage line is itself a
        // success report.
        let settled_by = match (&record.result, &record.report) {
            (Some(previous), _) => Some(previous.origin.as_str()),
            (None, Some(report))
                if report.value == Report::NoTestFiles || outcome == Outcome::Failure =>
            {
                Some(report.origin.as_str())
            }
            _ => None,
        };
        if let Some(previous) = settled_by {
            return Err(duplicate_result(package, previous, origin));
        }

        if outcome == Outcome::Failure {
            self.failure_seen = true;
        }
        record.result = Some(Evidence {
            value: outcome,
            origin,
        });
        Ok(())
    }

    fn set_report(&mut self, package: &str, report: Report, origin: String) -> Result<()> {
        let record = record_mut(&mut self.packages, package);

        match report {
            Report::NoTestFiles => {
                if let Some(previous) = &record.result {
                    return Err(duplicate_result(package, &previous.origin, origin));
                }
                if let Some(previous) = &record.report {
                    return Err(duplicate_result(package, &previous.origin, origin));
                }
            }
            Report::Coverage(_) => {
                if let Some(previous) = &record.report {
                    return Err(Error::DuplicateCoverage {
                        package: package.to_string(),
                        previous: previous.origin.clone(),
                        current: origin,
                    });
                }
                if let Some(previous) = &record.result
                    && previous.value == Outcome::Failure
                {
                    return Err(duplicate_result(package, &previous.origin, origin));
                }
            }
        }

        record.report = Some(Evidence {
            value: report,
            origin,
        });
        Ok(())
    }

    /// Whether any package reported a test failure so far.
    pub fn failure_seen(&self) -> bool {
        self.failure_seen
    }

    /// The fatal error that halted processing, if any.
    pub fn fatal(&self) -> Option<&Error> {
        self.fatal.as_ref()
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageRecord> {
        self.packages.values()
    }

    /// End the stream and judge every package.
    ///
    /// A fatal stream error is returned as-is. A package count mismatch
    /// short-circuits per-package evaluation. Otherwise packages are judged
    /// in sorted order and every failure is collected in the verdict.
    pub fn finish(self, gate: CoverageGate, expected_packages: Option<usize>) -> Result<Verdict> {
        if let Some(err) = self.fatal {
            return Err(err);
        }

        if let Some(expected) = expected_packages
            && expected != self.packages.len()
        {
            return Err(Error::PackageCountMismatch {
                expected,
                observed: self.packages.keys().cloned().collect(),
            });
        }

        let packages: Vec<PackageRecord> = self.packages.into_values().collect();
        let failures: Vec<Error> = packages.iter().filter_map(|p| judge(p, gate)).collect();

        tracing::debug!(
            packages = packages.len(),
            failures = failures.len(),
            "finalized run"
        );

        Ok(Verdict { packages, failures })
    }
}

fn duplicate_result(package: &str, previous: &str, current: String) -> Error {
    Error::DuplicateResult {
        package: package.to_string(),
        previous: previous.to_string(),
        current,
    }
}

fn record_mut<'a>(
    packages: &'a mut BTreeMap<String, PackageRecord>,
    name: &str,
) -> &'a mut PackageRecord {
    packages
        .entry(name.to_string())
        .or_insert_with(|| PackageRecord::new(name))
}

/// Judge one package. Coverage equal to the minimum passes.
fn judge(record: &PackageRecord, gate: CoverageGate) -> Option<Error> {
    let package = record.name.clone();
    match (record.status(), gate) {
        (PackageStatus::NoTestFiles, _) => None,
        (PackageStatus::Failure, _) => Some(Error::TestsFailed { package }),
        (_, CoverageGate::Disabled) => None,
        (PackageStatus::Success | PackageStatus::Unset, CoverageGate::Minimum(minimum)) => {
            match record.coverage() {
                None => Some(Error::MissingCoverage { package }),
                Some(coverage) if coverage < minimum => Some(Error::CoverageBelowThreshold {
                    package,
                    coverage,
                    minimum,
                }),
                Some(_) => None,
            }
        }
    }
}
