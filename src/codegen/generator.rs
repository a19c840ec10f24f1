//! Source tree driver
//!
//! Ties the scanner, the pipeline and a [`DirectorySink`] together for one
//! output directory, and keeps that directory's manifest current.

use super::manifest::Manifest;
use super::pipeline::{GenerationReport, Pipeline};
use super::sink::{DirectorySink, MemorySink};
use crate::config::CodegenConfig;
use crate::convention::Convention;
use crate::declaration::{DeclarationNode, ScanOutcome, SourceScanner};
use crate::error::{CodegenError, Result};
use crate::template::{TemplateRenderer, TemplateSpec};
use serde::Serialize;
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of [`Generator::generate`]
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub report: GenerationReport,
    /// Every source file that was scanned
    pub sources: Vec<PathBuf>,
    pub parsed: usize,
    pub reused: usize,
    pub skipped: Vec<PathBuf>,
    /// Orphaned generated files deleted from the output directory
    pub removed: Vec<PathBuf>,
}

/// Difference between the output directory and a fresh render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Drift {
    Missing { file_name: String },
    Changed { file_name: String, diff: String },
    Orphaned { file_name: String },
}

impl std::fmt::Display for Drift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Drift::Missing { file_name } => write!(f, "missing: {file_name}"),
            Drift::Changed { file_name, diff } => write!(f, "changed: {file_name}\n{diff}"),
            Drift::Orphaned { file_name } => write!(f, "orphaned: {file_name}"),
        }
    }
}

/// A trigger found in the source tree
#[derive(Debug, Clone, Serialize)]
pub struct TriggerListing {
    pub declaration: DeclarationNode,
    pub feature: String,
}

#[derive(Debug)]
pub struct Generator {
    scanner: SourceScanner,
    pipeline: Pipeline,
    out_dir: PathBuf,
    clean_orphans: bool,
}

impl Generator {
    pub fn new(scanner: SourceScanner, pipeline: Pipeline, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            scanner,
            pipeline,
            out_dir: out_dir.into(),
            clean_orphans: true,
        }
    }

    pub fn from_config(config: &CodegenConfig) -> Result<Self> {
        let scanner = SourceScanner::new(
            config.source_roots.clone(),
            config.include.as_slice(),
            config.exclude.as_slice(),
        )?;

        let renderer = if config.templates.is_empty() {
            TemplateRenderer::builtin()?
        } else {
            let specs = config
                .templates
                .iter()
                .map(|template| TemplateSpec::from_file(&template.path, &template.file_name))
                .collect::<Result<Vec<_>>>()?;
            TemplateRenderer::new(specs)?
        };

        let pipeline = Pipeline::new(Convention::new(&config.suffix), renderer)
            .with_validation(config.validation)
            .with_format(config.format);

        Ok(Self::new(scanner, pipeline, &config.out_dir).with_clean_orphans(config.clean_orphans))
    }

    pub fn with_clean_orphans(mut self, clean_orphans: bool) -> Self {
        self.clean_orphans = clean_orphans;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Scan, render and write every generated unit, then refresh the manifest
    pub fn generate(&self) -> Result<GenerationSummary> {
        let scan = self.scanner.scan()?;
        let sink = DirectorySink::new(&self.out_dir)?;
        let report = self.pipeline.run(&scan.declarations, &sink)?;

        let emitted = sink.emitted();
        let mut manifest = Manifest::new(
            self.pipeline.convention().suffix(),
            self.pipeline.renderer().fingerprint(),
        );
        for (file_name, feature) in &report.units {
            if let Some(hash) = emitted.get(file_name) {
                manifest.record(file_name, feature, hash);
            }
        }

        let removed = match self.previous_manifest() {
            Some(previous) if self.clean_orphans => {
                manifest.remove_orphans(&previous, &self.out_dir, false)
            }
            _ => Vec::new(),
        };
        manifest.save(&self.out_dir)?;

        Ok(summarize(scan, report, removed))
    }

    /// Compare the output directory with what [`generate`](Self::generate) would write
    pub fn check(&self) -> Result<Vec<Drift>> {
        let scan = self.scanner.scan()?;
        let sink = MemorySink::new();
        let report = self.pipeline.run(&scan.declarations, &sink)?;
        let units = sink.into_units();

        let mut drift = Vec::new();
        for (file_name, expected) in &units {
            let path = self.out_dir.join(file_name);
            match fs::read_to_string(&path) {
                Ok(actual) if &actual == expected => {}
                Ok(actual) => drift.push(Drift::Changed {
                    file_name: file_name.clone(),
                    diff: TextDiff::from_lines(&actual, expected)
                        .unified_diff()
                        .context_radius(3)
                        .header(&format!("{} (on disk)", file_name), &format!("{} (generated)", file_name))
                        .to_string(),
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => drift.push(Drift::Missing {
                    file_name: file_name.clone(),
                }),
                Err(e) => return Err(CodegenError::io(path, e)),
            }
        }

        if let Some(previous) = self.previous_manifest() {
            for file_name in previous.artifacts.keys() {
                if !report.units.contains_key(file_name) && self.out_dir.join(file_name).is_file() {
                    drift.push(Drift::Orphaned {
                        file_name: file_name.clone(),
                    });
                }
            }
        }

        Ok(drift)
    }

    /// Triggers in the source tree and the feature names they map to
    pub fn list(&self) -> Result<Vec<TriggerListing>> {
        let scan = self.scanner.scan()?;
        let convention = self.pipeline.convention();
        Ok(scan
            .declarations
            .into_iter()
            .filter_map(|declaration| {
                convention
                    .match_trigger(&declaration)
                    .map(|feature| TriggerListing {
                        declaration,
                        feature,
                    })
            })
            .collect())
    }

    fn previous_manifest(&self) -> Option<Manifest> {
        match Manifest::load(&self.out_dir) {
            Ok(manifest) => manifest,
            Err(error) => {
                tracing::warn!(%error, "ignoring unreadable manifest");
                None
            }
        }
    }
}

fn summarize(scan: ScanOutcome, report: GenerationReport, removed: Vec<PathBuf>) -> GenerationSummary {
    GenerationSummary {
        report,
        sources: scan.files,
        parsed: scan.parsed,
        reused: scan.reused,
        skipped: scan.skipped.into_iter().map(|(path, _)| path).collect(),
        removed,
    }
}
