//! Build script entry point
//!
//! ```rust,no_run
//! // build.rs
//! fn main() -> anyhow::Result<()> {
//!     aggregate_codegen::Builder::new().generate()?;
//!     Ok(())
//! }
//! ```
//!
//! ```rust,ignore
//! // src/order.rs
//! pub struct OrderAggregate { /* ... */ }
//! pub struct OrderAggregateId(String);
//!
//! aggregate_codegen::include_generated!("Order");
//! ```

use crate::codegen::{GenerationSummary, Generator, ValidationMode};
use crate::config::{CodegenConfig, TemplateConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Configures a generation run from `build.rs`
#[derive(Debug, Clone)]
pub struct Builder {
    config: CodegenConfig,
    out_dir: Option<PathBuf>,
    emit_rerun_if_changed: bool,
    /// Set once a caller names a source root; the default `src` is dropped then
    roots_overridden: bool,
}

impl Builder {
    /// Scan `src` and write into `$OUT_DIR`
    pub fn new() -> Self {
        Self {
            config: CodegenConfig::default(),
            out_dir: None,
            emit_rerun_if_changed: true,
            roots_overridden: false,
        }
    }

    /// Add a source root; the first call replaces the default `src`
    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        if !self.roots_overridden {
            self.config.source_roots.clear();
            self.roots_overridden = true;
        }
        self.config.source_roots.push(root.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.suffix = suffix.into();
        self
    }

    /// Render `path` instead of the built-in template, once per feature
    pub fn template(mut self, path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        self.config.templates.push(TemplateConfig {
            path: path.into(),
            file_name: file_name.into(),
        });
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.exclude.push(pattern.into());
        self
    }

    pub fn validation(mut self, mode: ValidationMode) -> Self {
        self.config.validation = mode;
        self
    }

    pub fn format(mut self, format: bool) -> Self {
        self.config.format = format;
        self
    }

    /// Write somewhere other than `$OUT_DIR`
    pub fn out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }

    /// Print `cargo:rerun-if-changed` lines (on by default)
    pub fn emit_rerun_if_changed(mut self, emit: bool) -> Self {
        self.emit_rerun_if_changed = emit;
        self
    }

    pub fn generate(self) -> Result<GenerationSummary> {
        let Self {
            mut config,
            out_dir,
            emit_rerun_if_changed,
            ..
        } = self;

        config.out_dir = match out_dir {
            Some(out_dir) => out_dir,
            None => env::var_os("OUT_DIR")
                .map(PathBuf::from)
                .context("OUT_DIR is not set; call Builder::out_dir outside build scripts")?,
        };

        if let Some(manifest_dir) = env::var_os("CARGO_MANIFEST_DIR") {
            config = config.resolve_paths(&PathBuf::from(manifest_dir));
        }
        config.validate()?;

        let generator = Generator::from_config(&config)?;
        let summary = generator
            .generate()
            .with_context(|| format!("failed to generate into {:?}", config.out_dir))?;

        if emit_rerun_if_changed {
            for root in &config.source_roots {
                println!("cargo:rerun-if-changed={}", root.display());
            }
            for source in &summary.sources {
                println!("cargo:rerun-if-changed={}", source.display());
            }
            for template in &config.templates {
                println!("cargo:rerun-if-changed={}", template.path.display());
            }
        }
        for collision in &summary.report.collisions {
            println!(
                "cargo:warning=aggregate-codegen: {} is generated by {}; the last one wins",
                collision.file_name,
                collision.triggers.join(", ")
            );
        }

        Ok(summary)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Include the unit generated for a feature from `$OUT_DIR`
#[macro_export]
macro_rules! include_generated {
    ($feature:literal) => {
        include!(concat!(env!("OUT_DIR"), "/", $feature, ".g.rs"));
    };
}
