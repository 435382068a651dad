//! Shared test utilities for the md-manual test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let template = tmp.path().join("product_1.0.0.md");
//! let text = std::fs::read_to_string(&template).unwrap();
//! let refs = images::scan(&text);
//! let result = assets::relocate(&template, &out, &refs, &text, &search_dirs()).unwrap();
//! assert_eq!(copied_names(&result), vec!["login.png", "dashboard.jpg", "logo.svg"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::assets::Relocation;
use crate::config::ImagesConfig;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/manual/` to a temp directory and return it.
///
/// The copy holds `product_1.0.0.md`, its `config.yaml` variables file, and
/// the images it references under `images/` and `img/`.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/manual");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Extractors
// =========================================================================

/// Stock image search folders.
pub fn search_dirs() -> Vec<String> {
    ImagesConfig::default().search_dirs
}

/// File names of every copied asset, in copy order.
pub fn copied_names(relocation: &Relocation) -> Vec<String> {
    relocation
        .copied
        .iter()
        .map(|c| {
            c.destination
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        })
        .collect()
}
