//! Template Renderer
//!
//! Turns a feature name into generated source text. The built-in template
//! lives in `templates/aggregate.rs.tera` and produces, for a feature `F`, a
//! `pub mod F` with three submodules:
//!
//! - **events**: the `FEvent` base trait of every domain event of `FAggregate`
//! - **subscribers**: synchronous and asynchronous subscriber traits bound to `FEvent`
//! - **aggregate_store**: `AggregateStoreExt` with update, update-with-result,
//!   load and store, forwarding to the generic store with `F`'s types
//!
//! Generated code refers to runtime types under `::eventflow`, which the
//! consuming crate provides.

pub mod renderer;

pub use renderer::{
    BUILTIN_TEMPLATE, BUILTIN_TEMPLATE_NAME, DEFAULT_FILE_NAME, GeneratedArtifact, PLACEHOLDER,
    TemplateRenderer, TemplateSpec,
};
