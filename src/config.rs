//! Tool settings.
//!
//! Handles loading, validating, and merging the optional `md-manual.toml`
//! settings file. This is separate from the *variables* file (see
//! [`crate::variables`]), which holds the values substituted into a template.
//! Settings control how the tool behaves: where output lands, where the
//! variables file is looked up, which folders are searched for images, and
//! which version phrases are rewritten.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! dir = "output"              # Where rendered manuals go when --output is omitted
//! default_name = "result.md"  # Output filename when no version is known
//!
//! [variables]
//! search = ["config.yaml", "configs/config.yaml"]
//!
//! [images]
//! search_dirs = ["images", "img", "assets", "pics", "pictures"]
//!
//! [version]
//! labels = ["v", "版本 ", "Version ", "版本号：", "Version: "]
//! replace_bare = true
//! ```
//!
//! The settings file is sparse: user values are merged over the stock
//! defaults with [`merge_toml`], so a file only names what it overrides.
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default settings file name, looked up in the working directory.
pub const SETTINGS_FILE: &str = "md-manual.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool settings loaded from `md-manual.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Output location defaults.
    pub output: OutputConfig,
    /// Variables file lookup.
    pub variables: VariablesConfig,
    /// Image resolution fallbacks.
    pub images: ImagesConfig,
    /// Version phrase substitution.
    pub version: VersionConfig,
}

impl ToolConfig {
    /// Validate values that deserialize fine but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.default_name.trim().is_empty() || !self.output.default_name.ends_with(".md")
        {
            return Err(ConfigError::Validation(
                "output.default_name must be a non-empty .md filename".into(),
            ));
        }
        if self.output.default_name.contains(is_separator) {
            return Err(ConfigError::Validation(
                "output.default_name must not contain path separators".into(),
            ));
        }
        if self.variables.search.is_empty() {
            return Err(ConfigError::Validation(
                "variables.search must list at least one path".into(),
            ));
        }
        if let Some(bad) = self
            .images
            .search_dirs
            .iter()
            .find(|d| d.is_empty() || d.contains(is_separator) || *d == "." || *d == "..")
        {
            return Err(ConfigError::Validation(format!(
                "images.search_dirs entries must be plain folder names, got {bad:?}"
            )));
        }
        if self.version.labels.iter().any(|l| l.is_empty()) {
            return Err(ConfigError::Validation(
                "version.labels must not contain empty strings (use replace_bare)".into(),
            ));
        }
        Ok(())
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Where rendered output goes when no explicit path is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory (relative to the working directory) for generated manuals.
    pub dir: String,
    /// Filename used when neither the template nor the request carries a version.
    pub default_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            default_name: "result.md".to_string(),
        }
    }
}

/// Candidate locations for the variables file, tried in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariablesConfig {
    pub search: Vec<String>,
}

impl Default for VariablesConfig {
    fn default() -> Self {
        Self {
            search: vec!["config.yaml".to_string(), "configs/config.yaml".to_string()],
        }
    }
}

/// Conventional folders searched by base name when an image path does not resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub search_dirs: Vec<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            search_dirs: ["images", "img", "assets", "pics", "pictures"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Which phrases around the old version token get rewritten.
///
/// Every label is prepended to the old token to form a candidate phrase
/// (`"Version "` + `1.0.0` → `"Version 1.0.0"`). With `replace_bare` the
/// token on its own is a candidate too.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersionConfig {
    pub labels: Vec<String>,
    pub replace_bare: bool,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            labels: ["v", "版本 ", "Version ", "版本号：", "Version: "]
                .into_iter()
                .map(String::from)
                .collect(),
            replace_bare: true,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default settings as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ToolConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `labels = [...]` list replaces the stock list rather than appending.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a settings file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ToolConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load settings from `path`, falling back to stock defaults when it is absent.
pub fn load_config(path: &Path) -> Result<ToolConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        tracing::debug!(path = %path.display(), "loaded settings file");
    }
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `md-manual.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# md-manual settings
# ==================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# This file configures the tool itself. Template variables live in the
# separate `key: value` variables file (config.yaml by default).
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Directory for rendered manuals when --output is not given.
dir = "output"

# Filename used when neither the template name nor --set-version carries
# a version. Must end in .md.
default_name = "result.md"

# ---------------------------------------------------------------------------
# Variables file lookup
# ---------------------------------------------------------------------------
[variables]
# Tried in order when --config is not given. The first existing file wins.
search = ["config.yaml", "configs/config.yaml"]

# ---------------------------------------------------------------------------
# Image resolution
# ---------------------------------------------------------------------------
[images]
# Folders searched (next to the template, then in the working directory)
# for an image's base name when its written path does not resolve.
search_dirs = ["images", "img", "assets", "pics", "pictures"]

# ---------------------------------------------------------------------------
# Version substitution
# ---------------------------------------------------------------------------
[version]
# Phrases rewritten from the template's version to the requested one.
# Each label is placed directly before the version token.
labels = ["v", "版本 ", "Version ", "版本号：", "Version: "]

# Also rewrite the version token when it stands on its own.
replace_bare = true
"##
}
