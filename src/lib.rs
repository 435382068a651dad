//! # md-manual
//!
//! Renders versioned Markdown manuals from templates. A template carries its
//! version in its filename (`product_1.0.0.md`); a build substitutes
//! `{{.key}}` placeholders from a plain `key: value` variables file, rewrites
//! the old version to the new one in the prose, and gathers every referenced
//! image into an asset folder next to the output so the result is
//! self-contained.
//!
//! ```text
//! templates/product_1.0.0.md  ──build──►  output/product_1.1.0.md
//! config.yaml                             output/product_1.1.0.assets/
//! images/login.png                            └── login.png
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`variables`] | `key: value` variables file: parsing, loading, lookup |
//! | [`version`] | Version token in template filenames, format check, output naming |
//! | [`images`] | Markdown/HTML image reference scanning and source resolution |
//! | [`assets`] | Copies images into `<stem>.assets/` and rewrites references |
//! | [`render`] | Version substitution with image shielding, then placeholder substitution |
//! | [`pipeline`] | `build`, `check`, and `scan_template` orchestration |
//! | [`config`] | Optional `md-manual.toml` tool settings: loading, merging, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Relocate Before Rendering
//!
//! Images are resolved and copied from the template text exactly as written,
//! then the rewritten text is rendered. Rendering never sees an image path it
//! has to resolve, and version substitution never sees an image path at all:
//! image markup is swapped out for opaque tokens while version phrases are
//! rewritten, then restored. A screenshot named `login_1.0.0.png` keeps its
//! name.
//!
//! ## Placeholders, Not a Template Language
//!
//! Templates only support `{{.key}}` lookups. There are no conditionals, no
//! loops, and no escaping, so Markdown that happens to contain `{%` or `{#`
//! renders untouched. A placeholder whose key is missing fails the build.
//!
//! ## Version Phrases
//!
//! Only the old version token is rewritten, and only where it appears as one
//! of a configurable set of phrases (`v1.0.0`, `Version 1.0.0`, `版本 1.0.0`,
//! bare `1.0.0`, ...). Matching is a single left-to-right pass preferring the
//! longest phrase, so a new version that contains the old one as a substring
//! is never rewritten twice, and `11.0.0` is never mistaken for `1.0.0`.

pub mod assets;
pub mod config;
pub mod images;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod variables;
pub mod version;

#[cfg(test)]
pub(crate) mod test_helpers;
