//! CLI output formatting for build, check, and scan.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Template: templates/product_1.0.0.md
//!     Version: 1.0.0 → 1.1.0
//!     Variables: config.yaml (3 entries)
//! Images
//! 001 login.png (12 bytes)
//!     Source: templates/images/login.png
//! 002 https://example.com/badge.png
//!     External, left in place
//! Assets: output/product_1.1.0.assets
//! Output: /home/me/manuals/output/product_1.1.0.md
//! ```
//!
//! ## Check
//!
//! ```text
//! Template: product_1.0.0.md
//!     Version: 1.0.0 → 1.1.0
//!     Variables: config.yaml (3 entries)
//!     Output: output/product_1.1.0.md
//! Images
//! 001 ./images/login.png
//!     Source: images/login.png
//! 002 ./images/gone.png
//!     Missing
//! Undefined variables
//!     author
//! 2 problems found
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::pipeline::{BuildReport, CheckReport, ReferenceStatus};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1.0.0 → 2.0.0`, or whichever half is known.
fn version_change(old: &str, new: &str) -> String {
    match (old.is_empty(), new.is_empty()) {
        (true, true) => "none".to_string(),
        (false, true) => format!("{old} (unchanged)"),
        (true, false) => new.to_string(),
        (false, false) if old == new => format!("{old} (unchanged)"),
        (false, false) => format!("{old} → {new}"),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn header_lines(
    template: &Path,
    old_version: &str,
    new_version: &str,
    variables_path: &Path,
    variable_count: usize,
) -> Vec<String> {
    vec![
        format!("Template: {}", template.display()),
        format!(
            "{}Version: {}",
            indent(1),
            version_change(old_version, new_version)
        ),
        format!(
            "{}Variables: {} ({})",
            indent(1),
            variables_path.display(),
            plural(variable_count, "entry", "entries")
        ),
    ]
}

/// One numbered entry per reference with its resolution status underneath.
fn reference_lines(references: &[ReferenceStatus]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, status) in references.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), status.reference.raw));
        let detail = if status.reference.external {
            "External, left in place".to_string()
        } else {
            match &status.resolved {
                Some(path) => format!("Source: {}", path.display()),
                None => "Missing".to_string(),
            }
        };
        lines.push(format!("{}{}", indent(1), detail));
    }
    lines
}

// ============================================================================
// Build
// ============================================================================

/// Format the summary of a completed build.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = header_lines(
        &report.template,
        &report.old_version,
        &report.new_version,
        &report.variables_path,
        report.variable_count,
    );

    if !report.copied.is_empty() || !report.external.is_empty() {
        lines.push("Images".to_string());
        let mut index = 0;
        for asset in &report.copied {
            index += 1;
            let name = asset
                .destination
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            lines.push(format!(
                "{} {} ({})",
                format_index(index),
                name,
                plural(asset.bytes as usize, "byte", "bytes")
            ));
            lines.push(format!("{}Source: {}", indent(1), asset.source.display()));
        }
        for raw in &report.external {
            index += 1;
            lines.push(format!("{} {}", format_index(index), raw));
            lines.push(format!("{}External, left in place", indent(1)));
        }
    }

    if !report.copied.is_empty() {
        lines.push(format!("Assets: {}", report.asset_dir.display()));
    }
    lines.push(format!("Output: {}", report.resolved_output.display()));
    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format a dry-run report, ending with the problem count.
pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = header_lines(
        &report.template,
        &report.old_version,
        &report.new_version,
        &report.variables_path,
        report.variable_count,
    );
    lines.push(format!(
        "{}Output: {}",
        indent(1),
        report.output_path.display()
    ));

    if !report.references.is_empty() {
        lines.push("Images".to_string());
        lines.extend(reference_lines(&report.references));
    }

    if !report.undefined.is_empty() {
        lines.push("Undefined variables".to_string());
        for name in &report.undefined {
            lines.push(format!("{}{}", indent(1), name));
        }
    }

    if !report.malformed.is_empty() {
        lines.push("Malformed placeholders".to_string());
        for placeholder in &report.malformed {
            lines.push(format!("{}{}", indent(1), placeholder));
        }
    }

    let problems = report.problem_count();
    if problems == 0 {
        lines.push("No problems found".to_string());
    } else {
        lines.push(format!("{} found", plural(problems, "problem", "problems")));
    }
    lines
}

/// Print check output to stdout.
pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Scan
// ============================================================================

/// Format the image references found in a template.
pub fn format_scan_output(references: &[ReferenceStatus]) -> Vec<String> {
    if references.is_empty() {
        return vec!["No images".to_string()];
    }
    let mut lines = vec!["Images".to_string()];
    lines.extend(reference_lines(references));
    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(references: &[ReferenceStatus]) {
    for line in format_scan_output(references) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
