//! Version tokens embedded in template filenames.
//!
//! A template named `product_1.2.3.md` carries the version `1.2.3`. The token
//! is always three dot-separated ASCII numbers sitting between an underscore
//! and the `.md` extension; anything else means "no version".
//!
//! - `product_1.2.3.md` → `"1.2.3"`
//! - `product_zh-CN_1.2.3.md` → `"1.2.3"`
//! - `product.md` → `""`
//! - `product_1.2.md` → `""`

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

static FILENAME_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([0-9]+\.[0-9]+\.[0-9]+)\.md$").unwrap());

static VERSION_FORMAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").unwrap());

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version {0:?}: expected x.y.z (e.g. 1.0.1)")]
    InvalidFormat(String),
}

/// Last path component, splitting on both `/` and `\` regardless of platform.
pub fn base_filename(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

/// Extract the `x.y.z` token from a filename ending in `_x.y.z.md`.
///
/// Only the base filename is inspected. Returns an empty string when there
/// is no token.
pub fn extract_from_filename(name: &str) -> String {
    FILENAME_VERSION_RE
        .captures(base_filename(name))
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// Same as [`extract_from_filename`] for a filesystem path.
pub fn extract_from_path(path: &Path) -> String {
    extract_from_filename(&path.to_string_lossy())
}

/// `true` for the empty string or a full `x.y.z` match.
pub fn is_valid_format(token: &str) -> bool {
    token.is_empty() || VERSION_FORMAT_RE.is_match(token)
}

/// Gate for user-supplied versions.
pub fn validate(token: &str) -> Result<(), VersionError> {
    if is_valid_format(token) {
        Ok(())
    } else {
        Err(VersionError::InvalidFormat(token.to_string()))
    }
}

/// Name the output file for a template rendered at `new_version`.
///
/// Keeps everything in the template's filename except the version suffix, so
/// product names and locale tags survive. Without a version in the filename
/// the output is `<new_version>.md`, and without either it is `fallback`.
pub fn generate_output_name(template_path: &Path, new_version: &str, fallback: &str) -> String {
    let lossy = template_path.to_string_lossy();
    let filename = base_filename(&lossy);
    let old_version = extract_from_filename(filename);

    if !old_version.is_empty() && !new_version.is_empty() {
        let old_suffix = format!("_{old_version}.md");
        let stem = &filename[..filename.len() - old_suffix.len()];
        return format!("{stem}_{new_version}.md");
    }
    if !new_version.is_empty() {
        return format!("{new_version}.md");
    }
    fallback.to_string()
}
