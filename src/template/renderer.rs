//! Tera-backed template rendering
//!
//! Every template is rendered with a context holding a single variable,
//! [`PLACEHOLDER`], set to the feature name. The generated file name is a
//! template of its own and sees the same context.

use crate::codegen::compute_string_hash;
use crate::error::{CodegenError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tera::{Context, Tera};

/// Name of the only template variable
pub const PLACEHOLDER: &str = "feature";

/// Built-in aggregate scaffolding template
pub const BUILTIN_TEMPLATE: &str = include_str!("../../templates/aggregate.rs.tera");

pub const BUILTIN_TEMPLATE_NAME: &str = "aggregate.rs";

/// File name pattern of generated units
pub const DEFAULT_FILE_NAME: &str = "{{ feature }}.g.rs";

/// A rendered source file, identified by its file name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub file_name: String,
    pub source: String,
}

/// Template text plus the pattern naming its output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    pub name: String,
    pub source: String,
    pub file_name: String,
}

impl TemplateSpec {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            file_name: file_name.into(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_TEMPLATE_NAME, BUILTIN_TEMPLATE, DEFAULT_FILE_NAME)
    }

    /// Load a template from disk, named after its file stem
    pub fn from_file(path: &Path, file_name: impl Into<String>) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| CodegenError::io(path, e))?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("custom")
            .to_string();
        Ok(Self::new(name, source, file_name))
    }
}

/// Renders feature names into generated artifacts
#[derive(Debug)]
pub struct TemplateRenderer {
    tera: Tera,
    templates: Vec<TemplateSpec>,
    fingerprint: String,
}

impl TemplateRenderer {
    /// Renderer holding only the built-in template
    pub fn builtin() -> Result<Self> {
        Self::new(vec![TemplateSpec::builtin()])
    }

    pub fn new(templates: Vec<TemplateSpec>) -> Result<Self> {
        if templates.is_empty() {
            return Err(CodegenError::config("at least one template is required"));
        }

        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());

        let mut fingerprint_input = String::new();
        for spec in &templates {
            tera.add_raw_template(&spec.name, &spec.source)
                .map_err(|e| CodegenError::template(&spec.name, e))?;
            tera.add_raw_template(&file_name_key(&spec.name), &spec.file_name)
                .map_err(|e| CodegenError::template(&spec.name, e))?;

            fingerprint_input.push_str(&spec.name);
            fingerprint_input.push('\0');
            fingerprint_input.push_str(&spec.file_name);
            fingerprint_input.push('\0');
            fingerprint_input.push_str(&spec.source);
            fingerprint_input.push('\0');
        }

        Ok(Self {
            tera,
            templates,
            fingerprint: compute_string_hash(&fingerprint_input),
        })
    }

    /// Register one more template, rendered after the existing ones
    pub fn with_template(self, spec: TemplateSpec) -> Result<Self> {
        let mut templates = self.templates;
        templates.push(spec);
        Self::new(templates)
    }

    /// Render every registered template for `feature`, in registration order
    ///
    /// Pure: the same feature always yields byte-identical artifacts. An empty
    /// feature renders fine; the result just isn't valid Rust.
    pub fn render(&self, feature: &str) -> Result<Vec<GeneratedArtifact>> {
        let mut context = Context::new();
        context.insert(PLACEHOLDER, feature);

        self.templates
            .iter()
            .map(|spec| {
                let source = self
                    .tera
                    .render(&spec.name, &context)
                    .map_err(|e| CodegenError::template(&spec.name, e))?;
                let file_name = self
                    .tera
                    .render(&file_name_key(&spec.name), &context)
                    .map_err(|e| CodegenError::template(&spec.name, e))?;
                Ok(GeneratedArtifact { file_name, source })
            })
            .collect()
    }

    /// SHA-256 over every template and file name pattern
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|spec| spec.name.as_str())
    }
}

fn file_name_key(template: &str) -> String {
    format!("{template}#file_name")
}
