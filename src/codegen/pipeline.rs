//! Generation pipeline
//!
//! ```text
//! DeclarationNode → Trigger Filter → Feature Extractor → Template Renderer → Output Sink
//! ```
//!
//! Filter, extractor and renderer are pure, so the pipeline can evaluate
//! declarations in parallel and memoize rendered artifacts per feature name.
//! Emission happens afterwards in declaration order, which makes
//! last-write-wins between colliding triggers deterministic.

use super::sink::OutputSink;
use super::validation::{
    GeneratedCodeValidator, ValidationMode, compute_string_hash, format_code,
};
use crate::convention::Convention;
use crate::declaration::DeclarationNode;
use crate::error::Result;
use crate::template::{GeneratedArtifact, TemplateRenderer};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A trigger ready for emission
#[derive(Debug, Clone)]
pub struct PreparedUnit {
    /// Declared name of the trigger
    pub trigger: String,
    pub feature: String,
    pub artifacts: Arc<Vec<GeneratedArtifact>>,
    pub from_cache: bool,
}

/// Two or more triggers rendered to the same file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub file_name: String,
    /// Triggers in emission order; the last one won
    pub triggers: Vec<String>,
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub declarations: usize,
    pub triggers: usize,
    /// Calls made to the sink
    pub emitted: usize,
    pub memo_hits: usize,
    pub collisions: Vec<Collision>,
    /// file name → feature of the unit that was registered last
    pub units: BTreeMap<String, String>,
}

impl GenerationReport {
    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }
}

pub struct Pipeline {
    convention: Convention,
    renderer: TemplateRenderer,
    validator: GeneratedCodeValidator,
    validation: ValidationMode,
    format: bool,
    memo: RwLock<HashMap<String, Arc<Vec<GeneratedArtifact>>>>,
}

impl Pipeline {
    pub fn new(convention: Convention, renderer: TemplateRenderer) -> Self {
        Self {
            convention,
            renderer,
            validator: GeneratedCodeValidator::new(),
            validation: ValidationMode::Off,
            format: false,
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Default convention and the built-in template
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(Convention::default(), TemplateRenderer::builtin()?))
    }

    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    pub fn with_format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }

    pub fn convention(&self) -> &Convention {
        &self.convention
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Filter, extract and render one declaration without emitting
    pub fn prepare(&self, node: &DeclarationNode) -> Result<Option<PreparedUnit>> {
        let Some(feature) = self.convention.match_trigger(node) else {
            return Ok(None);
        };

        let key = self.memo_key(&feature);
        if let Some(artifacts) = self.memo.read().get(&key) {
            return Ok(Some(PreparedUnit {
                trigger: node.name.clone(),
                feature,
                artifacts: artifacts.clone(),
                from_cache: true,
            }));
        }

        let rendered = self.renderer.render(&feature)?;
        let artifacts = Arc::new(
            rendered
                .into_iter()
                .map(|artifact| self.post_process(artifact))
                .collect::<Result<Vec<_>>>()?,
        );

        self.memo.write().insert(key, artifacts.clone());
        tracing::debug!(trigger = %node.describe(), feature = %feature, "rendered trigger");

        Ok(Some(PreparedUnit {
            trigger: node.name.clone(),
            feature,
            artifacts,
            from_cache: false,
        }))
    }

    /// Run one declaration through the whole pipeline
    pub fn process(
        &self,
        node: &DeclarationNode,
        sink: &dyn OutputSink,
    ) -> Result<Option<PreparedUnit>> {
        let prepared = self.prepare(node)?;
        if let Some(unit) = &prepared {
            for artifact in unit.artifacts.iter() {
                sink.emit(&artifact.file_name, &artifact.source)?;
            }
        }
        Ok(prepared)
    }

    /// Run every declaration, rendering in parallel and emitting in order
    pub fn run(&self, nodes: &[DeclarationNode], sink: &dyn OutputSink) -> Result<GenerationReport> {
        let prepared: Vec<Option<PreparedUnit>> = nodes
            .par_iter()
            .map(|node| self.prepare(node))
            .collect::<Result<_>>()?;

        let mut report = GenerationReport {
            declarations: nodes.len(),
            ..GenerationReport::default()
        };
        let mut writers: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for unit in prepared.into_iter().flatten() {
            report.triggers += 1;
            if unit.from_cache {
                report.memo_hits += 1;
            }
            for artifact in unit.artifacts.iter() {
                sink.emit(&artifact.file_name, &artifact.source)?;
                report.emitted += 1;
                report
                    .units
                    .insert(artifact.file_name.clone(), unit.feature.clone());
                writers
                    .entry(artifact.file_name.clone())
                    .or_default()
                    .push(unit.trigger.clone());
            }
        }

        for (file_name, triggers) in writers {
            if triggers.len() > 1 {
                tracing::warn!(
                    file = %file_name,
                    triggers = ?triggers,
                    "several triggers generate the same file; the last one wins"
                );
                report.collisions.push(Collision {
                    file_name,
                    triggers,
                });
            }
        }

        tracing::info!(
            declarations = report.declarations,
            triggers = report.triggers,
            units = report.units.len(),
            memo_hits = report.memo_hits,
            collisions = report.collisions.len(),
            "generation pipeline complete"
        );

        Ok(report)
    }

    /// Drop memoized renders
    pub fn clear_cache(&self) {
        self.memo.write().clear();
    }

    pub fn cached_features(&self) -> usize {
        self.memo.read().len()
    }

    fn memo_key(&self, feature: &str) -> String {
        compute_string_hash(&format!(
            "{}\0{}\0{}\0{}",
            self.renderer.fingerprint(),
            self.validation,
            self.format,
            feature
        ))
    }

    fn post_process(&self, artifact: GeneratedArtifact) -> Result<GeneratedArtifact> {
        if self.validation != ValidationMode::Off {
            let report = self.validator.validate(&artifact.source, &artifact.file_name);
            for issue in &report.issues {
                tracing::warn!(
                    file = %artifact.file_name,
                    line = ?issue.line,
                    severity = ?issue.severity,
                    "{}",
                    issue.message
                );
            }
            if self.validation == ValidationMode::Deny {
                report.into_result()?;
            }
        }

        if !self.format {
            return Ok(artifact);
        }

        match format_code(&artifact.source) {
            Ok(source) => Ok(GeneratedArtifact { source, ..artifact }),
            Err(e) => {
                tracing::debug!(file = %artifact.file_name, "left unformatted: {}", e);
                Ok(artifact)
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("convention", &self.convention)
            .field("validation", &self.validation)
            .field("format", &self.format)
            .field("cached_features", &self.cached_features())
            .finish()
    }
}
