//! Build orchestration: template in, versioned manual plus assets out.
//!
//! ```text
//! validate version ─► read template ─► load variables ─► output path
//!        ─► scan images ─► relocate (copy + rewrite) ─► render ─► write
//! ```
//!
//! Relocation runs on the *original* template text, before any rendering, so
//! image paths are resolved exactly as the author wrote them. Rendering then
//! works on the rewritten text, whose image markup it shields from version
//! substitution.
//!
//! [`check`] follows the same steps without touching the filesystem and
//! collects problems instead of stopping at the first one.

use crate::assets::{self, AssetError, CopiedAsset};
use crate::config::{ConfigError, ToolConfig};
use crate::images::{self, ImageRef};
use crate::render::{self, RenderError};
use crate::variables::{self, VERSION_KEY, Variables, VariablesError};
use crate::version::{self, VersionError};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Variables(#[from] VariablesError),
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// What to build.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub template: PathBuf,
    /// Variables file; looked up from the configured search list when `None`.
    pub variables: Option<PathBuf>,
    /// Output file; `<output.dir>/<generated name>` when `None`.
    pub output: Option<PathBuf>,
    /// Overrides the `version` entry of the variables file.
    pub version: Option<String>,
}

/// What a build did.
#[derive(Debug)]
pub struct BuildReport {
    pub template: PathBuf,
    pub variables_path: PathBuf,
    pub variable_count: usize,
    /// Version found in the template filename, empty if none.
    pub old_version: String,
    /// Version the manual was rendered at, empty if none.
    pub new_version: String,
    /// Output path as requested or configured.
    pub output_path: PathBuf,
    /// `output_path` made absolute against the working directory.
    pub resolved_output: PathBuf,
    pub asset_dir: PathBuf,
    pub copied: Vec<CopiedAsset>,
    /// External references left as they were.
    pub external: Vec<String>,
}

/// An image reference and the file it resolved to, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceStatus {
    #[serde(flatten)]
    pub reference: ImageRef,
    pub resolved: Option<PathBuf>,
}

impl ReferenceStatus {
    /// Local and not found on disk.
    pub fn is_missing(&self) -> bool {
        !self.reference.external && self.resolved.is_none()
    }
}

/// What a build would do, and what would stop it.
#[derive(Debug)]
pub struct CheckReport {
    pub template: PathBuf,
    pub variables_path: PathBuf,
    pub variable_count: usize,
    pub old_version: String,
    pub new_version: String,
    pub output_path: PathBuf,
    pub references: Vec<ReferenceStatus>,
    /// Placeholders with no variable, in document order.
    pub undefined: Vec<String>,
    /// Field references that are not well-formed placeholders.
    pub malformed: Vec<String>,
}

impl CheckReport {
    pub fn missing_images(&self) -> impl Iterator<Item = &ReferenceStatus> {
        self.references.iter().filter(|r| r.is_missing())
    }

    pub fn problem_count(&self) -> usize {
        self.missing_images().count() + self.undefined.len() + self.malformed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.problem_count() == 0
    }
}

/// Inputs shared by [`build`] and [`check`].
struct Prepared {
    text: String,
    variables: Variables,
    variables_path: PathBuf,
    old_version: String,
    new_version: String,
    output_path: PathBuf,
}

fn prepare(request: &BuildRequest, config: &ToolConfig) -> Result<Prepared, PipelineError> {
    if let Some(requested) = &request.version {
        version::validate(requested)?;
    }

    let template = &request.template;
    if !template.is_file() {
        return Err(PipelineError::TemplateNotFound(template.clone()));
    }
    let text = fs::read_to_string(template).map_err(|source| PipelineError::Io {
        path: template.clone(),
        source,
    })?;

    let variables_path =
        variables::locate_variables_file(request.variables.as_deref(), &config.variables.search);
    let mut variables = Variables::load(&variables_path)?;
    if let Some(requested) = &request.version {
        variables.insert(VERSION_KEY, requested.as_str());
    }

    let old_version = version::extract_from_path(template);
    let new_version = variables.get(VERSION_KEY).unwrap_or_default().to_string();
    tracing::debug!(template = %template.display(), %old_version, %new_version, "prepared build");
    let output_path = match &request.output {
        Some(path) => path.clone(),
        None => Path::new(&config.output.dir).join(version::generate_output_name(
            template,
            &new_version,
            &config.output.default_name,
        )),
    };

    Ok(Prepared {
        text,
        variables,
        variables_path,
        old_version,
        new_version,
        output_path,
    })
}

/// Render `request.template` and write it, with its images, to the output
/// location.
///
/// Aborts on the first failure. Images already copied at that point are
/// left in place.
pub fn build(request: &BuildRequest, config: &ToolConfig) -> Result<BuildReport, PipelineError> {
    let prepared = prepare(request, config)?;
    let template = &request.template;
    let output_path = prepared.output_path;

    let refs = images::scan(&prepared.text);
    let external = refs
        .iter()
        .filter(|r| r.external)
        .map(|r| r.raw.clone())
        .collect();
    let relocation = assets::relocate(
        template,
        &output_path,
        &refs,
        &prepared.text,
        &config.images.search_dirs,
    )?;

    let rendered = render::render_text(
        template,
        &relocation.text,
        &prepared.variables,
        &config.version,
    )?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&output_path, rendered).map_err(|source| PipelineError::Io {
        path: output_path.clone(),
        source,
    })?;
    let resolved_output =
        std::path::absolute(&output_path).unwrap_or_else(|_| output_path.clone());
    tracing::info!(path = %resolved_output.display(), "wrote manual");

    Ok(BuildReport {
        template: template.clone(),
        variables_path: prepared.variables_path,
        variable_count: prepared.variables.len(),
        old_version: prepared.old_version,
        new_version: prepared.new_version,
        output_path,
        resolved_output,
        asset_dir: relocation.asset_dir,
        copied: relocation.copied,
        external,
    })
}

/// Validate a build without writing anything.
///
/// Missing inputs (template, variables file) and a malformed requested
/// version are still errors. Unresolvable images and undefined placeholders
/// are collected into the report.
pub fn check(request: &BuildRequest, config: &ToolConfig) -> Result<CheckReport, PipelineError> {
    let prepared = prepare(request, config)?;
    let references = resolve_references(
        &request.template,
        &prepared.text,
        &config.images.search_dirs,
    );
    let undefined = render::undefined_variables(&prepared.text, &prepared.variables);
    let malformed = render::malformed_placeholders(&prepared.text);

    Ok(CheckReport {
        template: request.template.clone(),
        variables_path: prepared.variables_path,
        variable_count: prepared.variables.len(),
        old_version: prepared.old_version,
        new_version: prepared.new_version,
        output_path: prepared.output_path,
        references,
        undefined,
        malformed,
    })
}

/// List the image references in a template and where each resolves.
pub fn scan_template(
    template: &Path,
    config: &ToolConfig,
) -> Result<Vec<ReferenceStatus>, PipelineError> {
    if !template.is_file() {
        return Err(PipelineError::TemplateNotFound(template.to_path_buf()));
    }
    let text = fs::read_to_string(template).map_err(|source| PipelineError::Io {
        path: template.to_path_buf(),
        source,
    })?;
    Ok(resolve_references(
        template,
        &text,
        &config.images.search_dirs,
    ))
}

fn resolve_references(template: &Path, text: &str, search_dirs: &[String]) -> Vec<ReferenceStatus> {
    images::scan(text)
        .into_iter()
        .map(|reference| {
            let resolved = if reference.external {
                None
            } else {
                images::resolve(&reference.raw, template, search_dirs).ok()
            };
            ReferenceStatus {
                reference,
                resolved,
            }
        })
        .collect()
}
