//! Image reference discovery and source resolution.
//!
//! Two fixed grammars are recognised, nothing more:
//!
//! ```text
//! ![alt text](path/to/image.png)          Markdown
//! ![alt](image.jpg?v=2)                   Markdown with query string
//! <img src="path/to/image.png" alt="x">   HTML, either quote style
//! ```
//!
//! The target must end in a known image extension (case-insensitive). Alt
//! text may span lines and may contain one level of matched brackets; a
//! Markdown target may contain balanced parentheses (`login(1).png`).
//!
//! ## Resolution
//!
//! Template authors write image paths relative to all sorts of places, so
//! [`resolve`] walks an ordered list of candidates and returns the first file
//! that exists:
//!
//! 1. the path itself, if absolute
//! 2. `<template dir>/<path>`
//! 3. `./` stripped, against the template dir
//! 4. `../` stripped, against the template dir's parent
//! 5. `<working dir>/<path>`
//! 6. `<template dir>/<folder>/<base name>` then `<working dir>/<folder>/<base name>`
//!    for each conventional folder (`images`, `img`, `assets`, ...)
//! 7. backslashes normalised to `/`, against the template dir

use regex::{Captures, Regex};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Recognised image extensions, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "svg", "ico", "tiff", "tif",
];

const EXT_ALTERNATION: &str = "png|jpe?g|gif|bmp|webp|svg|ico|tiff?";

/// `![alt](target)`; `head` is `![alt](`, `tail` is the closing paren.
pub(crate) static MARKDOWN_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<head>!\[(?:[^\[\]]|\[[^\[\]]*\])*\]\()(?P<target>(?:[^()\n]|\([^()\n]*\))+?\.(?i:{EXT_ALTERNATION})(?:\?[^()\n]*)?)(?P<tail>\s*\))"
    ))
    .unwrap()
});

/// `<img ... src="target" ...>`; the target lands in `dq` or `sq` by quote style.
pub(crate) static HTML_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?P<head><img\b[^>]*?\ssrc\s*=\s*)(?:"(?P<dq>[^"\n>]+?\.(?i:{EXT_ALTERNATION})(?:[.?#][^"\n>]*)?)"|'(?P<sq>[^'\n>]+?\.(?i:{EXT_ALTERNATION})(?:[.?#][^'\n>]*)?)')(?P<tail>[^>]*>)"#
    ))
    .unwrap()
});

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("could not locate image: {raw}")]
    NotFound { raw: String },
}

/// Which grammar an image reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    Markdown,
    Html,
}

/// One image occurrence in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    /// Target as written (trimmed; doubled HTML extensions already fixed).
    pub raw: String,
    pub kind: MarkupKind,
    /// Byte offset of the whole markup match.
    pub start: usize,
    /// Byte offset just past the markup match.
    pub end: usize,
    /// Remote or inline (`http://`, `https://`, `//`, `data:`); never relocated.
    pub external: bool,
}

impl ImageRef {
    fn new(raw: String, kind: MarkupKind, start: usize, end: usize) -> Self {
        let external = is_external(&raw);
        Self {
            raw,
            kind,
            start,
            end,
            external,
        }
    }

    /// The file name the image gets inside an asset directory.
    pub fn base_name(&self) -> &str {
        base_name(&self.raw)
    }
}

/// Find every image reference in `text`, in document order.
pub fn scan(text: &str) -> Vec<ImageRef> {
    let mut refs: Vec<ImageRef> = MARKDOWN_IMAGE_RE
        .captures_iter(text)
        .map(|caps| {
            let whole = caps.get(0).expect("group 0 always matches");
            ImageRef::new(
                caps["target"].trim().to_string(),
                MarkupKind::Markdown,
                whole.start(),
                whole.end(),
            )
        })
        .collect();

    refs.extend(HTML_IMAGE_RE.captures_iter(text).map(|caps| {
        let whole = caps.get(0).expect("group 0 always matches");
        let target = html_target(&caps).trim();
        ImageRef::new(
            strip_doubled_extension(target).to_string(),
            MarkupKind::Html,
            whole.start(),
            whole.end(),
        )
    }));

    refs.sort_by_key(|r| r.start);
    tracing::debug!(count = refs.len(), "scanned image references");
    refs
}

/// The quoted `src` value of an [`HTML_IMAGE_RE`] match.
pub(crate) fn html_target<'t>(caps: &Captures<'t>) -> &'t str {
    caps.name("dq")
        .or_else(|| caps.name("sq"))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

/// `photo.png.png` → `photo.png`. Anything else is returned unchanged.
pub fn strip_doubled_extension(path: &str) -> &str {
    let lower = path.to_ascii_lowercase();
    for ext in IMAGE_EXTENSIONS {
        let single = format!(".{ext}");
        let doubled = format!(".{ext}.{ext}");
        if lower.ends_with(&doubled) {
            return &path[..path.len() - single.len()];
        }
    }
    path
}

/// Remote and inline images stay where they are.
pub fn is_external(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    ["http://", "https://", "ftp://", "//", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Drop a `?query` or `#fragment` suffix.
pub fn strip_query(raw: &str) -> &str {
    raw.split(|c: char| c == '?' || c == '#').next().unwrap_or(raw)
}

/// Final path component of a raw reference, ignoring query strings and
/// splitting on either slash style.
pub fn base_name(raw: &str) -> &str {
    crate::version::base_filename(strip_query(raw))
}

/// Every path [`resolve`] would try for `raw`, in order, deduplicated.
///
/// `cwd` makes the working-directory fallbacks explicit so this stays pure.
pub fn candidate_paths(
    raw: &str,
    template_path: &Path,
    cwd: &Path,
    search_dirs: &[String],
) -> Vec<PathBuf> {
    let path_part = strip_query(raw);
    let template_dir = match template_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => cwd.join(dir),
        _ => cwd.to_path_buf(),
    };

    let mut candidates = Vec::new();

    if Path::new(path_part).is_absolute() {
        candidates.push(PathBuf::from(path_part));
    }
    candidates.push(template_dir.join(path_part));
    if let Some(rest) = path_part.strip_prefix("./") {
        candidates.push(template_dir.join(rest));
    }
    if let Some(rest) = path_part.strip_prefix("../") {
        let parent = template_dir.parent().unwrap_or(&template_dir);
        candidates.push(parent.join(rest));
    }
    candidates.push(cwd.join(path_part));

    let base = base_name(raw);
    for dir in search_dirs {
        candidates.push(template_dir.join(dir).join(base));
        candidates.push(cwd.join(dir).join(base));
    }

    if path_part.contains('\\') {
        candidates.push(template_dir.join(path_part.replace('\\', "/")));
    }

    let mut unique: Vec<PathBuf> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

/// Locate the file an image reference points at.
pub fn resolve(
    raw: &str,
    template_path: &Path,
    search_dirs: &[String],
) -> Result<PathBuf, ImageError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_in(raw, template_path, &cwd, search_dirs)
}

/// [`resolve`] with an explicit working directory.
pub fn resolve_in(
    raw: &str,
    template_path: &Path,
    cwd: &Path,
    search_dirs: &[String],
) -> Result<PathBuf, ImageError> {
    for candidate in candidate_paths(raw, template_path, cwd, search_dirs) {
        if candidate.is_file() {
            tracing::debug!(raw, path = %candidate.display(), "resolved image");
            return Ok(candidate);
        }
        tracing::trace!(raw, path = %candidate.display(), "image candidate missing");
    }
    Err(ImageError::NotFound {
        raw: raw.to_string(),
    })
}
