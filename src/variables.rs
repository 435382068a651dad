//! Template variables from a line-oriented `key: value` file.
//!
//! The variables file is deliberately not YAML even though it usually carries
//! a `.yaml` extension. Each non-blank line is split on its **first** colon,
//! so values may contain further colons (URLs, times):
//!
//! ```text
//! title: Operator Manual
//! homepage: https://example.com/docs
//!
//! company: Example Corp
//! ```
//!
//! Lines without a colon are ignored. Parsing itself never fails; only
//! reading the file can.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Variable the pipeline injects from the requested version.
pub const VERSION_KEY: &str = "version";

#[derive(Error, Debug)]
pub enum VariablesError {
    #[error("variables file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read variables file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Mapping of variable name to string value.
///
/// Ordered so that [`Variables::to_config_text`] is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    /// Parse `key: value` lines. Later duplicates overwrite earlier ones.
    pub fn parse(text: &str) -> Self {
        let values = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self { values }
    }

    /// Read and parse a variables file.
    pub fn load(path: &Path) -> Result<Self, VariablesError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let vars = Self::parse(&text);
                tracing::debug!(path = %path.display(), count = vars.len(), "loaded variables");
                Ok(vars)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(VariablesError::NotFound(path.to_path_buf()))
            }
            Err(source) => Err(VariablesError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Serialize back to the `key: value` line format.
    pub fn to_config_text(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{k}: {v}\n"))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Pick the variables file: an explicit path wins, otherwise the first
/// existing entry of `search`.
///
/// When nothing in `search` exists, the first candidate is returned so the
/// subsequent load reports a not-found error naming the expected default.
pub fn locate_variables_file(explicit: Option<&Path>, search: &[String]) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    search
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .or_else(|| search.first().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    /// Printable ASCII without colons, no surrounding spaces.
    fn key_strategy() -> impl Strategy<Value = String> {
        "[!-9;-~]([ -9;-~]{0,10}[!-9;-~])?"
    }

    /// Printable ASCII (colons allowed), no surrounding spaces, may be empty.
    fn value_strategy() -> impl Strategy<Value = String> {
        "([!-~]([ -~]{0,20}[!-~])?)?"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn serialized_form_reparses_to_same_map(
            map in prop::collection::btree_map(key_strategy(), value_strategy(), 0..8)
        ) {
            let original: Variables = map.clone().into_iter().collect();
            let reparsed = Variables::parse(&original.to_config_text());
            prop_assert_eq!(&reparsed, &original);
            prop_assert_eq!(reparsed.len(), map.len());
            for (k, v) in &map {
                prop_assert_eq!(reparsed.get(k), Some(v.as_str()));
            }
        }
    }

    #[test]
    fn parse_simple_pairs() {
        let vars = Variables::parse("title: Demo\ncompany: Example Corp\n");
        assert_eq!(vars.get("title"), Some("Demo"));
        assert_eq!(vars.get("company"), Some("Example Corp"));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn parse_splits_on_first_colon_only() {
        let vars = Variables::parse("homepage: https://example.com:8080/docs");
        assert_eq!(vars.get("homepage"), Some("https://example.com:8080/docs"));
    }

    #[test]
    fn parse_trims_keys_and_values() {
        let vars = Variables::parse("   title   :    Spaced Out   ");
        assert_eq!(vars.get("title"), Some("Spaced Out"));
    }

    #[test]
    fn parse_skips_blank_lines_and_lines_without_colon() {
        let vars = Variables::parse("\n   \ntitle: Demo\njust some text\n\t\n");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("title"), Some("Demo"));
    }

    #[test]
    fn parse_handles_crlf() {
        let vars = Variables::parse("title: Demo\r\nauthor: Ann\r\n");
        assert_eq!(vars.get("title"), Some("Demo"));
        assert_eq!(vars.get("author"), Some("Ann"));
    }

    #[test]
    fn parse_empty_value_is_kept() {
        let vars = Variables::parse("subtitle:");
        assert_eq!(vars.get("subtitle"), Some(""));
    }

    #[test]
    fn parse_later_duplicate_wins() {
        let vars = Variables::parse("title: First\ntitle: Second");
        assert_eq!(vars.get("title"), Some("Second"));
    }

    #[test]
    fn parse_non_ascii_values() {
        let vars = Variables::parse("产品名称：忽略\n产品: 控制台\n");
        // Full-width colon is not a delimiter
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("产品"), Some("控制台"));
    }

    #[test]
    fn reparse_of_serialized_form_is_identical() {
        let original: Variables = [
            ("title", "Demo"),
            ("homepage", "https://example.com/a:b"),
            ("version", "2.0.0"),
            ("empty", ""),
        ]
        .into_iter()
        .collect();

        let reparsed = Variables::parse(&original.to_config_text());
        assert_eq!(reparsed, original);
        assert_eq!(Variables::parse(&reparsed.to_config_text()), original);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = Variables::load(&tmp.path().join("nope.yaml"));
        assert!(matches!(result, Err(VariablesError::NotFound(_))));
    }

    #[test]
    fn load_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "title: From Disk\n").unwrap();
        let vars = Variables::load(&path).unwrap();
        assert_eq!(vars.get("title"), Some("From Disk"));
    }

    #[test]
    fn locate_prefers_explicit_path() {
        let explicit = Path::new("/somewhere/vars.yaml");
        let found = locate_variables_file(Some(explicit), &["config.yaml".into()]);
        assert_eq!(found, explicit);
    }

    #[test]
    fn locate_falls_back_to_first_candidate() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("missing.yaml");
        let b = tmp.path().join("also-missing.yaml");
        let search = vec![
            a.to_string_lossy().to_string(),
            b.to_string_lossy().to_string(),
        ];
        assert_eq!(locate_variables_file(None, &search), a);
    }

    #[test]
    fn locate_picks_first_existing_candidate() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("config.yaml");
        let b = tmp.path().join("configs/config.yaml");
        fs::create_dir_all(b.parent().unwrap()).unwrap();
        fs::write(&b, "x: y").unwrap();
        let search = vec![
            a.to_string_lossy().to_string(),
            b.to_string_lossy().to_string(),
        ];
        assert_eq!(locate_variables_file(None, &search), b);
    }
}
