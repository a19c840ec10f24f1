//! Record of generated files in an output directory
//!
//! The manifest lets a later run find files it generated before and no longer
//! produces (an aggregate was renamed or removed) without ever touching files
//! it did not create.

use super::sink::validate_file_name;
use super::validation::compute_file_hash;
use crate::error::{CodegenError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "aggregen-manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub feature: String,
    pub content_hash: String,
}

/// Generated files of one run, keyed by file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub generator_version: String,
    pub suffix: String,
    pub template_fingerprint: String,
    pub artifacts: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new(suffix: impl Into<String>, template_fingerprint: impl Into<String>) -> Self {
        Self {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            suffix: suffix.into(),
            template_fingerprint: template_fingerprint.into(),
            artifacts: BTreeMap::new(),
        }
    }

    pub fn path_in(out_dir: &Path) -> PathBuf {
        out_dir.join(MANIFEST_FILE_NAME)
    }

    /// Manifest of a previous run, if the directory has one
    ///
    /// Entries that are not plain file names are dropped; nothing outside
    /// `out_dir` is ever addressed through a manifest.
    pub fn load(out_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(out_dir);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| CodegenError::io(&path, e))?;
        let mut manifest: Self = serde_json::from_str(&content)
            .map_err(|source| CodegenError::Manifest { path: path.clone(), source })?;
        manifest.artifacts.retain(|file_name, _| {
            let keep = validate_file_name(file_name).is_ok();
            if !keep {
                tracing::warn!(
                    manifest = %path.display(),
                    file = %file_name,
                    "ignoring manifest entry outside the output directory"
                );
            }
            keep
        });
        Ok(Some(manifest))
    }

    pub fn save(&self, out_dir: &Path) -> Result<()> {
        let path = Self::path_in(out_dir);
        let content =
            serde_json::to_string_pretty(self).map_err(|source| CodegenError::Manifest {
                path: path.clone(),
                source,
            })?;
        fs::write(&path, content).map_err(|e| CodegenError::io(&path, e))
    }

    pub fn record(
        &mut self,
        file_name: impl Into<String>,
        feature: impl Into<String>,
        content_hash: impl Into<String>,
    ) {
        self.artifacts.insert(
            file_name.into(),
            ManifestEntry {
                feature: feature.into(),
                content_hash: content_hash.into(),
            },
        );
    }

    /// Files recorded in `previous` that this manifest no longer contains
    ///
    /// Only plain file names qualify.
    pub fn orphans_since(&self, previous: &Manifest) -> Vec<String> {
        previous
            .artifacts
            .keys()
            .filter(|file_name| !self.artifacts.contains_key(*file_name))
            .filter(|file_name| validate_file_name(file_name).is_ok())
            .cloned()
            .collect()
    }

    /// Delete orphaned files from `out_dir`; returns the paths removed (or that would be)
    pub fn remove_orphans(
        &self,
        previous: &Manifest,
        out_dir: &Path,
        dry_run: bool,
    ) -> Vec<PathBuf> {
        let mut removed = Vec::new();

        for file_name in self.orphans_since(previous) {
            let path = out_dir.join(&file_name);
            if !path.is_file() {
                continue;
            }
            if dry_run {
                removed.push(path);
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(file = %path.display(), "removed orphaned generated file");
                    removed.push(path);
                }
                Err(e) => {
                    tracing::warn!("failed to remove orphaned file {:?}: {}", path, e);
                }
            }
        }

        removed
    }

    /// Whether the file on disk differs from what was recorded
    pub fn is_stale(&self, file_name: &str, out_dir: &Path) -> bool {
        match self.artifacts.get(file_name) {
            Some(entry) => match compute_file_hash(&out_dir.join(file_name)) {
                Ok(current) => current != entry.content_hash,
                Err(_) => true,
            },
            None => true,
        }
    }
}
