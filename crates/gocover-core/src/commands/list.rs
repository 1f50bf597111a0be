use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Regex for Go test function declarations.
///
/// Matches `func TestName(t *testing.T)` and friends (`*testing.M`, ...).
/// Captures: (1) the name without the `Test` prefix.
pub static TEST_FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    // safety: this regex is valid and tested
    Regex::new(r"^func\s+Test([a-zA-Z0-9_]*)\b.*\*testing\.[A-Z]\b").expect("valid regex")
});

/// Expand a package path into a glob for its test files.
///
/// `dir/...` (including `./...`) recurses; any other path scans only the
/// directory itself.
pub fn test_file_pattern(path: &str) -> String {
    match path.strip_suffix("...") {
        Some(root) => {
            let root = root.trim_end_matches('/');
            let root = if root.is_empty() { "." } else { root };
            format!("{root}/**/*_test.go")
        }
        None => format!("{}/*_test.go", path.trim_end_matches('/')),
    }
}

/// Collect test function names from Go source text.
pub fn parse_test_names(source: &str) -> impl Iterator<Item = String> + '_ {
    source
        .lines()
        .filter_map(|line| TEST_FUNC_RE.captures(line).map(|caps| caps[1].to_string()))
}

/// Find the distinct test function names under `paths`, sorted.
///
/// Names are reported without the `Test` prefix, matching how they are
/// passed to `-run`. When `prefix` is given only names starting with it
/// (case-insensitively) are kept.
pub fn discover_test_names(paths: &[String], prefix: Option<&str>) -> Result<Vec<String>> {
    let mut names = BTreeSet::new();

    for path in paths {
        let pattern = test_file_pattern(path);
        let entries = glob::glob(&pattern).map_err(|e| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid path {path}: {e}"),
            ))
        })?;

        for entry in entries {
            let file: PathBuf = entry.map_err(|e| {
                Error::Io(std::io::Error::new(e.error().kind(), e.to_string()))
            })?;
            if !file.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&file)?;
            names.extend(parse_test_names(&source));
        }
    }

    let prefix = prefix.map(str::to_lowercase);
    Ok(names
        .into_iter()
        .filter(|name| {
            prefix
                .as_deref()
                .is_none_or(|p| name.to_lowercase().starts_with(p))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = r#"package p

import "testing"

func TestAlpha(t *testing.T) {}
func TestBeta_Case(t *testing.T) {
}
func TestMain(m *testing.M) {}
func helperTest(t *testing.T) {}
func TestNoParam() {}
func BenchmarkAlpha(b *testing.B) {}
"#;

    #[test]
    fn test_parse_test_names() {
        let names: Vec<_> = parse_test_names(SOURCE).collect();
        assert_eq!(names, vec!["Alpha", "Beta_Case", "Main"]);
    }

    #[test]
    fn test_test_file_pattern() {
        assert_eq!(test_file_pattern("."), "./*_test.go");
        assert_eq!(test_file_pattern("./..."), "./**/*_test.go");
        assert_eq!(test_file_pattern("pkg/sub/"), "pkg/sub/*_test.go");
        assert_eq!(test_file_pattern("pkg/..."), "pkg/**/*_test.go");
        assert_eq!(test_file_pattern("..."), "./**/*_test.go");
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("a_test.go"), "func TestRoot(t *testing.T) {}\n")
            .expect("write");
        fs::write(dir.path().join("a.go"), "func TestNotATestFile(t *testing.T) {}\n")
            .expect("write");
        fs::create_dir_all(dir.path().join("sub")).expect("mkdir");
        fs::write(
            dir.path().join("sub").join("b_test.go"),
            "func TestNested(t *testing.T) {}\nfunc TestRoot(t *testing.T) {}\n",
        )
        .expect("write");
        dir
    }

    #[test]
    fn test_discover_root_only() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        let names = discover_test_names(&[root], None).expect("discover");
        assert_eq!(names, vec!["Root"]);
    }

    #[test]
    fn test_discover_recursive_is_distinct_and_sorted() {
        let dir = fixture();
        let recursive = format!("{}/...", dir.path().display());
        let names = discover_test_names(&[recursive], None).expect("discover");
        assert_eq!(names, vec!["Nested", "Root"]);
    }

    #[test]
    fn test_discover_prefix_is_case_insensitive() {
        let dir = fixture();
        let recursive = format!("{}/...", dir.path().display());
        let names = discover_test_names(&[recursive], Some("ne")).expect("discover");
        assert_eq!(names, vec!["Nested"]);
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("missing").display().to_string();
        assert!(
            discover_test_names(&[missing], None)
                .expect("discover")
                .is_empty()
        );
    }
}
