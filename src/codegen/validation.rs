//! Validation and formatting of generated code
//!
//! Off by default: template defects normally surface as compiler diagnostics
//! on the generated unit. When enabled, rendered text is parsed with `syn`
//! before it reaches the sink.

use crate::error::{CodegenError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use strum::{Display, EnumString};

/// What the pipeline does with validation findings
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Emit rendered text untouched
    #[default]
    Off,
    /// Log findings, emit anyway
    Warn,
    /// Refuse to emit invalid text
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
    /// 1-based line in the generated unit, when the finding has one
    pub line: Option<usize>,
}

/// Findings for one generated unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub file_name: String,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            issues: Vec::new(),
        }
    }

    fn push(&mut self, severity: ValidationSeverity, message: String, line: Option<usize>) {
        self.issues.push(ValidationIssue {
            severity,
            message,
            line,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == ValidationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == ValidationSeverity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// `Err(InvalidGeneratedSource)` listing every error, if there is one
    pub fn into_result(self) -> Result<()> {
        if !self.has_errors() {
            return Ok(());
        }
        let errors = self
            .errors()
            .map(|issue| match issue.line {
                Some(line) => format!("line {line}: {}", issue.message),
                None => issue.message.clone(),
            })
            .collect();
        Err(CodegenError::InvalidGeneratedSource {
            file_name: self.file_name,
            errors,
        })
    }
}

/// Checks rendered Rust source before emission
#[derive(Debug, Clone)]
pub struct GeneratedCodeValidator {
    /// Lines longer than this are reported as warnings
    pub max_line_length: usize,
}

impl GeneratedCodeValidator {
    pub fn new() -> Self {
        Self {
            max_line_length: 120,
        }
    }

    pub fn validate(&self, code: &str, file_name: &str) -> ValidationReport {
        let mut report = ValidationReport::new(file_name);

        if let Err(error) = syn::parse_file(code) {
            report.push(ValidationSeverity::Error, format!("syntax error: {error}"), None);
        }

        for (index, line) in code.lines().enumerate() {
            // a custom template can carry raw or escaped tags into the output
            if line.contains("{{") || line.contains("{%") {
                report.push(
                    ValidationSeverity::Error,
                    "unrendered template tag".to_string(),
                    Some(index + 1),
                );
            }
            if line.chars().count() > self.max_line_length {
                report.push(
                    ValidationSeverity::Warning,
                    format!("line longer than {} characters", self.max_line_length),
                    Some(index + 1),
                );
            }
        }

        report
    }
}

impl Default for GeneratedCodeValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-print valid Rust through `prettyplease`
///
/// Plain `//` comments do not survive; doc comments do.
pub fn format_code(code: &str) -> std::result::Result<String, syn::Error> {
    syn::parse_file(code).map(|file| prettyplease::unparse(&file))
}

/// SHA-256 of a file's bytes, hex encoded
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let content = fs::read(path).map_err(|e| CodegenError::io(path, e))?;
    Ok(hex_digest(&content))
}

/// SHA-256 of a string, hex encoded
pub fn compute_string_hash(content: &str) -> String {
    hex_digest(content.as_bytes())
}

fn hex_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
