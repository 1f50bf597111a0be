use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::classify::OutputFormat;
use crate::error::{Error, Result};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "gocover.yaml";

/// Project defaults for `gocover test`, read from `gocover.yaml`.
///
/// Every key is optional; command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GocoverConfig {
    /// Package paths handed to `go test`.
    #[serde(default)]
    pub packages: Vec<String>,

    /// Minimum coverage percentage per package.
    #[serde(default)]
    pub min_coverage: Option<f64>,

    /// Test timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub verbose: Option<bool>,

    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Number of distinct packages the run must report.
    #[serde(default)]
    pub expected_packages: Option<usize>,

    /// Test runner binary.
    #[serde(default)]
    pub go: Option<String>,
}

impl GocoverConfig {
    /// Parse and validate config text. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: GocoverConfig = yaml_serde::from_str(content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Load config from an explicit path, or from `gocover.yaml` in `dir`.
    ///
    /// A missing explicit file is an error; a missing implicit file yields
    /// the defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = dir.join(CONFIG_FILE_NAME);
                if !path.is_file() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|e| Error::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Self::parse(&content, &path)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: String| Error::Config {
            path: path.to_path_buf(),
            message,
        };

        if let Some(min) = self.min_coverage
            && !(0.0..=100.0).contains(&min)
        {
            return Err(invalid(format!(
                "minCoverage must be between 0 and 100, got {min}"
            )));
        }
        if self.timeout == Some(0) {
            return Err(invalid("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
packages:
  - ./...
minCoverage: 80.5
timeout: 120
verbose: true
format: text
expectedPackages: 3
go: /usr/local/go/bin/go
"#;
        let config = GocoverConfig::parse(yaml, Path::new("gocover.yaml")).expect("valid");
        assert_eq!(config.packages, vec!["./..."]);
        assert_eq!(config.min_coverage, Some(80.5));
        assert_eq!(config.timeout, Some(120));
        assert_eq!(config.verbose, Some(true));
        assert_eq!(config.format, Some(OutputFormat::Text));
        assert_eq!(config.expected_packages, Some(3));
        assert_eq!(config.go.as_deref(), Some("/usr/local/go/bin/go"));
    }

    #[test]
    fn test_parse_empty_mapping_gives_defaults() {
        let config = GocoverConfig::parse("{}", Path::new("gocover.yaml")).expect("valid");
        assert_eq!(config, GocoverConfig::default());
    }

    #[test]
    fn test_parse_rejects_out_of_range_coverage() {
        let err = GocoverConfig::parse("minCoverage: 101", Path::new("gocover.yaml"))
            .expect_err("out of range");
        assert!(err.to_string().contains("minCoverage must be between 0 and 100"));
    }

    #[test]
    fn test_parse_rejects_zero_timeout() {
        let err = GocoverConfig::parse("timeout: 0", Path::new("cfg.yaml")).expect_err("zero");
        assert_eq!(
            err.to_string(),
            "invalid config cfg.yaml: timeout must be positive"
        );
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(GocoverConfig::parse("minCoverag: 10", Path::new("gocover.yaml")).is_err());
    }

    #[test]
    fn test_load_missing_implicit_file_is_default() {
        let dir = TempDir::new().expect("tempdir");
        let config = GocoverConfig::load(None, dir.path()).expect("defaults");
        assert_eq!(config, GocoverConfig::default());
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            GocoverConfig::load(Some(&missing), dir.path()),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_load_implicit_file() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "minCoverage: 42\n").expect("write");
        let config = GocoverConfig::load(None, dir.path()).expect("valid");
        assert_eq!(config.min_coverage, Some(42.0));
    }
}
