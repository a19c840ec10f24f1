//! Code Generation Module
//!
//! ## Architecture
//!
//! ```text
//! Declarations → Trigger Filter → Feature Extractor → Template Rendering → (Validation) → Output Sink
//! ```
//!
//! ## Modules
//!
//! - **pipeline**: per-declaration processing with a render memo; batch runs in parallel
//! - **sink**: `OutputSink` registration table; in-memory and directory implementations
//! - **validation**: optional `syn` check and `prettyplease` formatting of generated code
//! - **manifest**: record of generated files, used to clean up orphans
//! - **generator**: source tree driver used by the CLI and build scripts
//!
//! ## Example Usage
//!
//! ```rust
//! use aggregate_codegen::codegen::{MemorySink, Pipeline};
//! use aggregate_codegen::declaration::{DeclarationKind, DeclarationNode};
//!
//! # fn example() -> aggregate_codegen::Result<()> {
//! let pipeline = Pipeline::builtin()?;
//! let sink = MemorySink::new();
//!
//! let nodes = vec![DeclarationNode::new(DeclarationKind::Struct, "OrderAggregate")];
//! let report = pipeline.run(&nodes, &sink)?;
//!
//! assert_eq!(report.triggers, 1);
//! assert!(sink.get("Order.g.rs").is_some());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod generator;
pub mod manifest;
pub mod pipeline;
pub mod sink;
pub mod validation;

pub use generator::{Drift, GenerationSummary, Generator, TriggerListing};
pub use manifest::{MANIFEST_FILE_NAME, Manifest, ManifestEntry};
pub use pipeline::{Collision, GenerationReport, Pipeline, PreparedUnit};
pub use sink::{DirectorySink, MemorySink, OutputSink};
pub use validation::{
    GeneratedCodeValidator, ValidationIssue, ValidationMode, ValidationReport, ValidationSeverity,
    compute_file_hash, compute_string_hash, format_code,
};
