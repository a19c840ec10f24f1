//! Output Sink
//!
//! Registers rendered source text under a file name. Emitting the same file
//! name twice replaces the earlier unit; nothing is parsed or validated here.

use super::validation::compute_string_hash;
use crate::error::{CodegenError, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// Registration table for generated units
pub trait OutputSink: Send + Sync {
    /// Register `source` as `file_name`, replacing any unit of the same name
    fn emit(&self, file_name: &str, source: &str) -> Result<()>;
}

// =============================================================================
// MemorySink
// =============================================================================

/// In-memory registration table, ordered by file name
#[derive(Debug, Default)]
pub struct MemorySink {
    units: Mutex<BTreeMap<String, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file_name: &str) -> Option<String> {
        self.units.lock().get(file_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.units.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.lock().is_empty()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.units.lock().keys().cloned().collect()
    }

    pub fn into_units(self) -> BTreeMap<String, String> {
        self.units.into_inner()
    }
}

impl OutputSink for MemorySink {
    fn emit(&self, file_name: &str, source: &str) -> Result<()> {
        self.units
            .lock()
            .insert(file_name.to_string(), source.to_string());
        Ok(())
    }
}

// =============================================================================
// DirectorySink
// =============================================================================

/// Writes units into a directory, atomically and only when content changed
#[derive(Debug)]
pub struct DirectorySink {
    out_dir: PathBuf,
    /// file name → content hash of everything emitted so far
    emitted: Mutex<BTreeMap<String, String>>,
}

impl DirectorySink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir).map_err(|e| CodegenError::io(&out_dir, e))?;
        Ok(Self {
            out_dir,
            emitted: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Content hashes of the units emitted through this sink
    pub fn emitted(&self) -> BTreeMap<String, String> {
        self.emitted.lock().clone()
    }

    pub fn path_for(&self, file_name: &str) -> Result<PathBuf> {
        validate_file_name(file_name)?;
        Ok(self.out_dir.join(file_name))
    }

    fn atomic_write(&self, path: &Path, content: &str) -> Result<()> {
        let mut temp_file =
            NamedTempFile::new_in(&self.out_dir).map_err(|e| CodegenError::io(&self.out_dir, e))?;
        temp_file
            .write_all(content.as_bytes())
            .and_then(|_| temp_file.flush())
            .map_err(|e| CodegenError::io(temp_file.path(), e))?;
        temp_file
            .persist(path)
            .map_err(|e| CodegenError::io(path, e.error))?;
        Ok(())
    }
}

impl OutputSink for DirectorySink {
    fn emit(&self, file_name: &str, source: &str) -> Result<()> {
        let path = self.path_for(file_name)?;
        let hash = compute_string_hash(source);

        let unchanged = fs::read_to_string(&path)
            .map(|existing| existing == source)
            .unwrap_or(false);

        if unchanged {
            tracing::trace!(file = %path.display(), "generated file unchanged");
        } else {
            self.atomic_write(&path, source)?;
            tracing::debug!(file = %path.display(), bytes = source.len(), "wrote generated file");
        }

        self.emitted.lock().insert(file_name.to_string(), hash);
        Ok(())
    }
}

/// Generated units are flat files inside the output directory
pub(crate) fn validate_file_name(file_name: &str) -> Result<()> {
    let path = Path::new(file_name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(CodegenError::config(format!(
            "generated file name {:?} must be a plain file name",
            file_name
        ))),
    }
}
