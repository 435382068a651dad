//! Copying referenced images next to the rendered output.
//!
//! Every rendered manual gets a sibling asset folder named after its stem:
//!
//! ```text
//! output/
//! ├── Console_1.1.0.md
//! └── Console_1.1.0.assets/
//!     ├── login.png
//!     └── dashboard.jpg
//! ```
//!
//! Local image references are rewritten to `./<stem>.assets/<base name>`, so
//! the output folder can be moved or zipped as a unit. Remote and inline
//! images (`https://`, `data:`) are left untouched.
//!
//! Copies are keyed by base name only: two different images that share a
//! file name overwrite each other, last one wins.

use crate::images::{self, HTML_IMAGE_RE, ImageError, ImageRef, MARKDOWN_IMAGE_RE};
use regex::Captures;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("failed to read image {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write image {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create asset directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One image copied into the asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedAsset {
    /// Reference as written in the template.
    pub raw: String,
    /// Where the bytes came from.
    pub source: PathBuf,
    /// Where the bytes went.
    pub destination: PathBuf,
    pub bytes: u64,
}

/// Result of relocating a document's images.
#[derive(Debug, Clone)]
pub struct Relocation {
    /// Document text with local image references rewritten.
    pub text: String,
    pub asset_dir: PathBuf,
    pub copied: Vec<CopiedAsset>,
}

/// Output file stem, e.g. `Console_1.1.0` for `output/Console_1.1.0.md`.
pub fn output_stem(output_path: &Path) -> String {
    output_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// `<output dir>/<stem>.assets`
pub fn asset_dir_for(output_path: &Path) -> PathBuf {
    let dir_name = format!("{}.assets", output_stem(output_path));
    match output_path.parent() {
        Some(parent) => parent.join(dir_name),
        None => PathBuf::from(dir_name),
    }
}

/// `./<stem>.assets/`, the prefix every relocated reference starts with.
pub fn asset_link_prefix(output_path: &Path) -> String {
    format!("./{}.assets/", output_stem(output_path))
}

/// Copy every local image in `refs` into the asset directory for
/// `output_path` and rewrite `text` to point at the copies.
///
/// Sources are resolved from the raw paths as written in the template, so
/// `refs` must come from scanning the original text. The first image that
/// cannot be located or read aborts the whole run; images copied before it
/// stay on disk.
pub fn relocate(
    template_path: &Path,
    output_path: &Path,
    refs: &[ImageRef],
    text: &str,
    search_dirs: &[String],
) -> Result<Relocation, AssetError> {
    let asset_dir = asset_dir_for(output_path);

    let mut local: Vec<&ImageRef> = Vec::new();
    for r in refs {
        if r.external {
            tracing::warn!(raw = %r.raw, "leaving external image in place");
        } else if !local.iter().any(|seen| seen.raw == r.raw) {
            local.push(r);
        }
    }

    let mut copied = Vec::with_capacity(local.len());
    if !local.is_empty() {
        fs::create_dir_all(&asset_dir).map_err(|source| AssetError::CreateDir {
            path: asset_dir.clone(),
            source,
        })?;
    }

    for r in local {
        let source = images::resolve(&r.raw, template_path, search_dirs)?;
        let destination = asset_dir.join(r.base_name());
        let bytes = copy_image(&source, &destination)?;
        tracing::info!(
            raw = %r.raw,
            to = %destination.display(),
            bytes,
            "copied image"
        );
        copied.push(CopiedAsset {
            raw: r.raw.clone(),
            source,
            destination,
            bytes,
        });
    }

    Ok(Relocation {
        text: rewrite_references(text, &asset_link_prefix(output_path)),
        asset_dir,
        copied,
    })
}

/// Read `source` and write it to `destination`, overwriting.
///
/// When both name the same file (relocating an already relocated document)
/// nothing is written.
fn copy_image(source: &Path, destination: &Path) -> Result<u64, AssetError> {
    let content = fs::read(source).map_err(|e| AssetError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    if same_file(source, destination) {
        return Ok(content.len() as u64);
    }
    fs::write(destination, &content).map_err(|e| AssetError::Write {
        path: destination.to_path_buf(),
        source: e,
    })?;
    Ok(content.len() as u64)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Point every local image reference in `text` at `prefix` + base name.
///
/// Markup around the target (alt text, other attributes, quote style) is
/// kept byte-for-byte. Doubled extensions in HTML targets are fixed. Running
/// this twice with the same prefix changes nothing the second time.
pub fn rewrite_references(text: &str, prefix: &str) -> String {
    let text = MARKDOWN_IMAGE_RE.replace_all(text, |caps: &Captures| {
        let target = caps["target"].trim();
        if images::is_external(target) {
            return caps[0].to_string();
        }
        format!(
            "{}{}{}{}",
            &caps["head"],
            prefix,
            images::base_name(target),
            &caps["tail"]
        )
    });

    HTML_IMAGE_RE
        .replace_all(&text, |caps: &Captures| {
            let target = images::html_target(caps).trim();
            if images::is_external(target) {
                return caps[0].to_string();
            }
            let quote = if caps.name("dq").is_some() { '"' } else { '\'' };
            let fixed = images::strip_doubled_extension(target);
            format!(
                "{}{quote}{prefix}{}{quote}{}",
                &caps["head"],
                images::base_name(fixed),
                &caps["tail"]
            )
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    const PREFIX: &str = "./out.assets/";

    #[test]
    fn asset_paths_follow_output_stem() {
        let out = Path::new("output/Console_zh-CN_1.1.0.md");
        assert_eq!(
            asset_dir_for(out),
            PathBuf::from("output/Console_zh-CN_1.1.0.assets")
        );
        assert_eq!(asset_link_prefix(out), "./Console_zh-CN_1.1.0.assets/");
    }

    #[test]
    fn rewrite_markdown_keeps_alt_text() {
        let out = rewrite_references("![Login [1]\nscreen](../shots/login.png)", PREFIX);
        assert_eq!(out, "![Login [1]\nscreen](./out.assets/login.png)");
    }

    #[test]
    fn rewrite_html_keeps_attributes_and_quotes() {
        let out = rewrite_references(
            "<img class=\"wide\" src='img\\a.jpg' width=\"40%\" />",
            PREFIX,
        );
        assert_eq!(out, "<img class=\"wide\" src='./out.assets/a.jpg' width=\"40%\" />");
    }

    #[test]
    fn rewrite_fixes_doubled_extension() {
        let out = rewrite_references(r#"<img src="pics/x.png.png">"#, PREFIX);
        assert_eq!(out, r#"<img src="./out.assets/x.png">"#);
    }

    #[test]
    fn rewrite_drops_query_string() {
        let out = rewrite_references("![a](x.png?v=2)", PREFIX);
        assert_eq!(out, "![a](./out.assets/x.png)");
    }

    #[test]
    fn rewrite_handles_parentheses_in_path() {
        let once = rewrite_references("![a](shots/login(1).png)", PREFIX);
        assert_eq!(once, "![a](./out.assets/login(1).png)");
        assert_eq!(rewrite_references(&once, PREFIX), once);
    }

    #[test]
    fn rewrite_leaves_external_images() {
        let text = "![a](https://example.com/a.png) <img src=\"//cdn.example.com/b.gif\">";
        assert_eq!(rewrite_references(text, PREFIX), text);
    }

    #[test]
    fn rewrite_is_idempotent() {
        let text = "![a](./images/a.png)\n<img src=\"b/b.svg\">\n![c](C:\\pics\\c.gif)";
        let once = rewrite_references(text, PREFIX);
        let twice = rewrite_references(&once, PREFIX);
        assert_eq!(once, twice);
        assert_eq!(
            once,
            "![a](./out.assets/a.png)\n<img src=\"./out.assets/b.svg\">\n![c](./out.assets/c.gif)"
        );
    }

    #[test]
    fn relocate_copies_and_rewrites() {
        let tmp = setup_fixtures();
        let template = tmp.path().join("product_1.0.0.md");
        let output = tmp.path().join("out/product_2.0.0.md");
        let text = std::fs::read_to_string(&template).unwrap();
        let refs = images::scan(&text);

        let result = relocate(&template, &output, &refs, &text, &search_dirs()).unwrap();

        assert_eq!(result.asset_dir, tmp.path().join("out/product_2.0.0.assets"));
        let names = copied_names(&result);
        assert_eq!(names, vec!["login.png", "dashboard.jpg", "logo.svg"]);
        for asset in &result.copied {
            assert_eq!(
                std::fs::read(&asset.destination).unwrap(),
                std::fs::read(&asset.source).unwrap()
            );
        }
        assert!(
            result
                .text
                .contains("![Login screen](./product_2.0.0.assets/login.png)")
        );
        assert!(
            result
                .text
                .contains("src=\"./product_2.0.0.assets/dashboard.jpg\"")
        );
        // External image untouched
        assert!(result.text.contains("https://example.com/badge.png"));
    }

    #[test]
    fn relocate_rescan_yields_canonical_paths() {
        let tmp = setup_fixtures();
        let template = tmp.path().join("product_1.0.0.md");
        let output = tmp.path().join("output.md");
        let text = std::fs::read_to_string(&template).unwrap();
        let refs = images::scan(&text);

        let first = relocate(&template, &output, &refs, &text, &search_dirs()).unwrap();
        let rescanned = images::scan(&first.text);
        for r in rescanned.iter().filter(|r| !r.external) {
            assert_eq!(r.raw, format!("./output.assets/{}", r.base_name()));
        }

        // Second pass, treating the output as the template
        std::fs::write(&output, &first.text).unwrap();
        let second = relocate(&output, &output, &rescanned, &first.text, &search_dirs()).unwrap();
        assert_eq!(second.text, first.text);
        assert_eq!(copied_names(&second), copied_names(&first));
        for asset in &second.copied {
            assert!(std::fs::metadata(&asset.destination).unwrap().len() > 0);
        }
    }

    #[test]
    fn relocate_missing_image_fails_with_raw_path() {
        let tmp = TempDir::new().unwrap();
        let template = tmp.path().join("t.md");
        let text = "![gone](./images/missing.png)";
        let refs = images::scan(text);

        let err = relocate(
            &template,
            &tmp.path().join("o.md"),
            &refs,
            text,
            &search_dirs(),
        )
        .unwrap_err();
        assert!(
            matches!(&err, AssetError::Image(ImageError::NotFound { raw }) if raw == "./images/missing.png")
        );
    }

    #[test]
    fn relocate_without_local_images_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let template = tmp.path().join("t.md");
        let output = tmp.path().join("o.md");
        let text = "no images, just ![remote](https://example.com/x.png)";
        let refs = images::scan(text);

        let result = relocate(&template, &output, &refs, text, &search_dirs()).unwrap();
        assert!(result.copied.is_empty());
        assert_eq!(result.text, text);
        assert!(!result.asset_dir.exists());
    }

    #[test]
    fn relocate_duplicate_references_copied_once() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.png"), b"png").unwrap();
        let template = tmp.path().join("t.md");
        let text = "![one](a.png) ![two](a.png)";
        let refs = images::scan(text);

        let result = relocate(
            &template,
            &tmp.path().join("o.md"),
            &refs,
            text,
            &search_dirs(),
        )
        .unwrap();
        assert_eq!(result.copied.len(), 1);
        assert_eq!(result.text, "![one](./o.assets/a.png) ![two](./o.assets/a.png)");
    }
}
