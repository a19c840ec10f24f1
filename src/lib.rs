pub mod builder;
pub mod codegen;
pub mod config;
pub mod convention;
pub mod declaration;
pub mod error;
pub mod logging;
pub mod template;

pub use builder::Builder;
pub use codegen::{
    GenerationReport, GenerationSummary, Generator, MemorySink, OutputSink, Pipeline,
    ValidationMode,
};
pub use config::{CliArgs, CodegenConfig, TemplateConfig};
pub use convention::{Convention, DEFAULT_SUFFIX};
pub use declaration::{DeclarationKind, DeclarationNode};
pub use error::{CodegenError, Result};
pub use logging::{LoggingConfig, init_logging};
pub use template::{GeneratedArtifact, TemplateRenderer};

use codegen::TriggerListing;

/// Run the CLI against a merged configuration
///
/// Returns the process exit code: non-zero when `--check` finds drift.
pub fn run(config: CodegenConfig, check: bool, list: bool) -> anyhow::Result<i32> {
    config.validate()?;
    let generator = Generator::from_config(&config)?;

    tracing::info!(
        roots = ?config.source_roots,
        out_dir = %config.out_dir.display(),
        suffix = %config.suffix,
        "starting aggregate code generation",
    );

    if list {
        print_listing(&generator.list()?);
        return Ok(0);
    }

    if check {
        let drift = generator.check()?;
        if drift.is_empty() {
            tracing::info!("generated files are up to date");
            return Ok(0);
        }
        for entry in &drift {
            println!("{entry}");
        }
        tracing::error!(count = drift.len(), "generated files are out of date");
        return Ok(1);
    }

    let summary = generator.generate()?;
    tracing::info!(
        sources = summary.sources.len(),
        parsed = summary.parsed,
        skipped = summary.skipped.len(),
        units = summary.report.units.len(),
        removed = summary.removed.len(),
        "generation complete"
    );
    Ok(0)
}

fn print_listing(listing: &[TriggerListing]) {
    for trigger in listing {
        println!("{}\t{}", trigger.feature, trigger.declaration.describe());
    }
}
