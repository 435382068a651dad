//! Template rendering: version substitution and variable substitution.
//!
//! Rendering happens in two passes over the template text:
//!
//! 1. **Version substitution.** When the template's filename carries a
//!    version (`manual_1.0.0.md`) and the variables carry a `version`, every
//!    configured phrase around the old token (`v1.0.0`, `Version 1.0.0`,
//!    `版本 1.0.0`, the bare `1.0.0`, ...) is rewritten to the new token.
//!    Image markup is shielded first, so screenshots named `login_1.0.0.png`
//!    or asset folders like `./manual_1.0.0.assets/` keep their paths.
//! 2. **Variable substitution.** `{{.key}}` placeholders are replaced with
//!    variable values. A placeholder naming an unknown key is an error, not
//!    an empty string.
//!
//! ## Phrase matching
//!
//! All candidate phrases are matched in one left-to-right pass, longest
//! phrase first at any given position. A phrase is only rewritten when the
//! token is not glued to more version digits, so `1.0.0` leaves `11.0.0`
//! and `1.0.0.4` alone.

use crate::config::VersionConfig;
use crate::images::{HTML_IMAGE_RE, MARKDOWN_IMAGE_RE};
use crate::variables::{VERSION_KEY, Variables};
use crate::version;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// `{{.key}}`, `{{ .key }}`, `{{- .key -}}`. Keys are anything the variables
/// file can hold short of whitespace and braces (`{{.release-date}}`).
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{-?\s*\.(?P<key>[^{}\s]+)\s*-?\}\}").unwrap()
});

/// The opening of a field reference. Outside a [`PLACEHOLDER_RE`] match it
/// marks a placeholder that cannot be rendered, e.g. `{{.}}` or `{{.a b}}`.
static FIELD_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{-?\s*\.").unwrap());

const SHIELD_OPEN: char = '\u{E000}';
const SHIELD_CLOSE: char = '\u{E001}';

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("undefined variable {name:?} in template")]
    UndefinedVariable { name: String },
    #[error("malformed placeholder {placeholder:?} in template")]
    MalformedPlaceholder { placeholder: String },
}

/// Read the template at `path` and render it.
pub fn render(
    path: &Path,
    variables: &Variables,
    rules: &VersionConfig,
) -> Result<Vec<u8>, RenderError> {
    let text = fs::read_to_string(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    render_text(path, &text, variables, rules).map(String::into_bytes)
}

/// Render already-loaded template text.
///
/// `template_path` is only consulted for the version token in its filename.
pub fn render_text(
    template_path: &Path,
    text: &str,
    variables: &Variables,
    rules: &VersionConfig,
) -> Result<String, RenderError> {
    let old_version = version::extract_from_path(template_path);
    let new_version = variables.get(VERSION_KEY).unwrap_or_default();

    let versioned = if old_version.is_empty() || new_version.is_empty() {
        text.to_string()
    } else {
        tracing::debug!(from = %old_version, to = new_version, "substituting version");
        substitute_version(text, &old_version, new_version, rules)
    };

    substitute_variables(&versioned, variables)
}

/// Replace every `{{.key}}` placeholder, failing on the first unknown key or
/// on a field reference that is not a well-formed placeholder.
pub fn substitute_variables(text: &str, variables: &Variables) -> Result<String, RenderError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always matches");
        if let Some(placeholder) = malformed_in(&text[last..whole.start()]).next() {
            return Err(RenderError::MalformedPlaceholder { placeholder });
        }
        let key = &caps["key"];
        let value = variables
            .get(key)
            .ok_or_else(|| RenderError::UndefinedVariable {
                name: key.to_string(),
            })?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    if let Some(placeholder) = malformed_in(&text[last..]).next() {
        return Err(RenderError::MalformedPlaceholder { placeholder });
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Distinct placeholder names in `text` that `variables` does not define,
/// in order of first appearance.
pub fn undefined_variables(text: &str, variables: &Variables) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let key = &caps["key"];
        if !variables.contains_key(key) && !missing.iter().any(|m| m == key) {
            missing.push(key.to_string());
        }
    }
    missing
}

/// Distinct field references in `text` that are not well-formed
/// placeholders, in order of first appearance.
pub fn malformed_placeholders(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut last = 0;
    let ends = PLACEHOLDER_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .chain(std::iter::once((text.len(), text.len())));
    for (start, end) in ends {
        for snippet in malformed_in(&text[last..start]) {
            if !found.contains(&snippet) {
                found.push(snippet);
            }
        }
        last = end;
    }
    found
}

/// Field openings in a stretch of text holding no valid placeholder, each
/// cut at the next `}}` or at the end of its line.
fn malformed_in(segment: &str) -> impl Iterator<Item = String> + '_ {
    FIELD_OPEN_RE.find_iter(segment).map(|m| {
        let rest = &segment[m.start()..];
        let line = rest.split('\n').next().unwrap_or(rest);
        match line.find("}}") {
            Some(close) => line[..close + 2].to_string(),
            None => line.trim_end().to_string(),
        }
    })
}

// ============================================================================
// Image shielding
// ============================================================================

/// Run `transform` over `text` with every image markup span swapped for an
/// opaque token, then put the markup back.
///
/// The originals only live for the duration of the call.
pub fn with_images_shielded(text: &str, transform: impl FnOnce(&str) -> String) -> String {
    let mut originals: Vec<String> = Vec::new();
    let shielded = shield(&MARKDOWN_IMAGE_RE, text, &mut originals);
    let shielded = shield(&HTML_IMAGE_RE, &shielded, &mut originals);

    let transformed = transform(&shielded);

    originals
        .iter()
        .enumerate()
        .rev()
        .fold(transformed, |acc, (i, original)| {
            acc.replace(&shield_token(i), original)
        })
}

fn shield(re: &Regex, text: &str, originals: &mut Vec<String>) -> String {
    re.replace_all(text, |caps: &regex::Captures| {
        let token = shield_token(originals.len());
        originals.push(caps[0].to_string());
        token
    })
    .into_owned()
}

fn shield_token(index: usize) -> String {
    format!("{SHIELD_OPEN}{index}{SHIELD_CLOSE}")
}

// ============================================================================
// Version substitution
// ============================================================================

/// Rewrite version phrases from `old` to `new` outside image markup.
pub fn substitute_version(text: &str, old: &str, new: &str, rules: &VersionConfig) -> String {
    if old.is_empty() || new.is_empty() || old == new {
        return text.to_string();
    }
    let Some(re) = phrase_regex(old, rules) else {
        return text.to_string();
    };
    with_images_shielded(text, |shielded| {
        replace_phrases(shielded, &re, old.len(), new)
    })
}

/// One alternation of every candidate phrase, longest first so the leftmost
/// match is also the longest one at that position.
fn phrase_regex(old: &str, rules: &VersionConfig) -> Option<Regex> {
    let mut phrases: Vec<String> = rules
        .labels
        .iter()
        .map(|label| format!("{label}{old}"))
        .collect();
    if rules.replace_bare {
        phrases.push(old.to_string());
    }
    phrases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    phrases.dedup();
    if phrases.is_empty() {
        return None;
    }

    let alternation = phrases
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&alternation) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(%err, "could not build version phrase pattern");
            None
        }
    }
}

/// Every candidate phrase ends in the old token, so the replacement keeps
/// the label (everything before the last `old_len` bytes) and appends `new`.
fn replace_phrases(text: &str, re: &Regex, old_len: usize, new: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut pos = 0;

    while let Some(m) = re.find_at(text, pos) {
        let token_start = m.end() - old_len;
        if glued_before(text, token_start) || glued_after(text, m.end()) {
            // Retry one character further so shorter phrases inside this
            // match still get a chance.
            pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(&text[m.start()..token_start]);
        out.push_str(new);
        last = m.end();
        pos = m.end();
    }
    out.push_str(&text[last..]);
    out
}

fn glued_before(text: &str, at: usize) -> bool {
    text[..at]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_digit() || c == '.')
}

fn glued_after(text: &str, at: usize) -> bool {
    let mut rest = text[at..].chars();
    match rest.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => rest.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}
