//! End-to-end tests for the generation pipeline
//!
//! Declaration → trigger filter → feature extractor → template → sink, with
//! real collaborators throughout.

use aggregate_codegen::CodegenError;
use aggregate_codegen::codegen::{MemorySink, OutputSink, Pipeline, ValidationMode};
use assert_matches::assert_matches;
use aggregate_codegen::declaration::{DeclarationKind, DeclarationNode};
use aggregate_codegen::template::TemplateRenderer;
use aggregate_codegen::{Convention, TemplateConfig};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn node(kind: DeclarationKind, name: &str) -> DeclarationNode {
    DeclarationNode::new(kind, name)
}

fn render_order() -> String {
    let renderer = TemplateRenderer::builtin().expect("builtin template");
    let mut artifacts = renderer.render("Order").expect("render");
    assert_eq!(artifacts.len(), 1);
    artifacts.remove(0).source
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[test]
fn order_aggregate_generates_one_unit_named_after_feature() {
    let pipeline = Pipeline::builtin().expect("pipeline");
    let sink = MemorySink::new();

    let report = pipeline
        .run(&[node(DeclarationKind::Struct, "OrderAggregate")], &sink)
        .expect("run");

    assert_eq!(report.triggers, 1);
    assert_eq!(sink.file_names(), vec!["Order.g.rs".to_string()]);
    assert_eq!(report.units.get("Order.g.rs").map(String::as_str), Some("Order"));
}

#[test]
fn generated_unit_contains_events_subscribers_and_store_operations() {
    let source = render_order();

    assert!(source.contains("pub mod Order {"));

    // base event
    assert!(source.contains("pub mod events {"));
    assert!(source.contains(
        "pub trait OrderEvent:\n            ::eventflow::aggregates::AggregateEvent<OrderAggregate, OrderAggregateId>"
    ));

    // subscriber capabilities
    assert!(source.contains("pub mod subscribers {"));
    assert!(source.contains("pub trait SubscribeSynchronousTo<TEvent>:"));
    assert!(source.contains("pub trait SubscribeAsynchronousTo<TEvent>:"));
    assert_eq!(source.matches("TEvent: OrderEvent,").count(), 4);

    // store conveniences
    assert!(source.contains("pub mod aggregate_store {"));
    assert!(source.contains("pub trait AggregateStoreExt: AggregateStore {"));
    for operation in ["fn update<", "fn update_with_result<", "fn load(", "fn store("] {
        assert!(source.contains(operation), "missing {operation}");
    }
    assert!(source.contains("AggregateStore::load_aggregate::<OrderAggregate, OrderAggregateId>("));
    assert_eq!(source.matches("SourceId::new()").count(), 3);
}

#[test]
fn generated_unit_is_valid_rust() {
    let source = render_order();
    let file = syn::parse_file(&source).expect("generated code parses");

    let module = file
        .items
        .iter()
        .find_map(|item| match item {
            syn::Item::Mod(module) => Some(module),
            _ => None,
        })
        .expect("top-level module");
    assert_eq!(module.ident, "Order");

    let submodules: Vec<String> = module
        .content
        .as_ref()
        .expect("inline module")
        .1
        .iter()
        .filter_map(|item| match item {
            syn::Item::Mod(m) => Some(m.ident.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(submodules, vec!["events", "subscribers", "aggregate_store"]);
}

#[test]
fn update_operations_take_closures_that_borrow_the_aggregate() {
    let source = render_order();

    assert!(source.contains("F: AsyncFnOnce(&mut OrderAggregate) + Send,"));
    assert!(source.contains("F: AsyncFnOnce(&mut OrderAggregate) -> TExecutionResult + Send,"));
    assert!(!source.contains("-> Fut"));

    let file = syn::parse_file(&source).expect("generated code parses");
    let async_closures = source.matches("async move |aggregate, _cancellation|").count();
    assert_eq!(async_closures, 2);
    assert!(!file.items.is_empty());
}

#[test]
fn non_triggers_emit_nothing() {
    let pipeline = Pipeline::builtin().expect("pipeline");
    let sink = MemorySink::new();

    let report = pipeline
        .run(
            &[
                node(DeclarationKind::Struct, "OrderEvent"),
                node(DeclarationKind::Field, "OrderAggregate"),
                node(DeclarationKind::Trait, "OrderAggregate"),
                node(DeclarationKind::Function, "OrderAggregate"),
            ],
            &sink,
        )
        .expect("run");

    assert_eq!(report.declarations, 4);
    assert_eq!(report.triggers, 0);
    assert!(sink.is_empty());
}

// =============================================================================
// Determinism and memoization
// =============================================================================

#[test]
fn rendering_is_idempotent() {
    let renderer = TemplateRenderer::builtin().expect("renderer");
    assert_eq!(renderer.render("Order").unwrap(), renderer.render("Order").unwrap());

    let other = TemplateRenderer::builtin().expect("renderer");
    assert_eq!(renderer.render("Order").unwrap(), other.render("Order").unwrap());
}

#[test]
fn rerun_over_same_declarations_hits_memo_and_emits_same_text() {
    let pipeline = Pipeline::builtin().expect("pipeline");
    let nodes = [
        node(DeclarationKind::Struct, "OrderAggregate"),
        node(DeclarationKind::Enum, "InvoiceAggregate"),
    ];

    let first_sink = MemorySink::new();
    let first = pipeline.run(&nodes, &first_sink).expect("first run");
    let second_sink = MemorySink::new();
    let second = pipeline.run(&nodes, &second_sink).expect("second run");

    assert_eq!(first.memo_hits, 0);
    assert_eq!(second.memo_hits, 2);
    assert_eq!(first_sink.into_units(), second_sink.into_units());
}

// =============================================================================
// Degenerate and colliding names
// =============================================================================

#[test]
fn bare_suffix_renders_empty_feature_without_crashing() {
    let pipeline = Pipeline::builtin().expect("pipeline");
    let sink = MemorySink::new();

    let report = pipeline
        .run(&[node(DeclarationKind::Struct, "Aggregate")], &sink)
        .expect("run");

    assert_eq!(report.triggers, 1);
    let source = sink.get(".g.rs").expect("unit registered under empty feature");
    assert!(source.contains("pub mod  {"));
    assert!(syn::parse_file(&source).is_err(), "empty feature is not valid Rust");
}

#[test]
fn colliding_triggers_register_one_unit_last_write_wins() {
    let renderer = TemplateRenderer::new(vec![aggregate_codegen::template::TemplateSpec::new(
        "origin",
        "// from {{ feature }}\n",
        "{{ feature }}.g.rs",
    )])
    .expect("renderer");
    let pipeline = Pipeline::new(Convention::default(), renderer);
    let sink = MemorySink::new();

    let report = pipeline
        .run(
            &[
                node(DeclarationKind::Struct, "OrderAggregate"),
                node(DeclarationKind::Enum, "OrderAggregate"),
            ],
            &sink,
        )
        .expect("run");

    assert_eq!(sink.len(), 1);
    assert!(sink.get("Order.g.rs").is_some());
    assert_eq!(report.emitted, 2);
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].file_name, "Order.g.rs");
    assert_eq!(
        report.collisions[0].triggers,
        vec!["OrderAggregate".to_string(), "OrderAggregate".to_string()]
    );
}

#[test]
fn deny_mode_fails_the_run_on_invalid_output() {
    let pipeline = Pipeline::builtin()
        .expect("pipeline")
        .with_validation(ValidationMode::Deny);
    let sink = MemorySink::new();

    let result = pipeline.run(
        &[
            node(DeclarationKind::Struct, "OrderAggregate"),
            node(DeclarationKind::Struct, "Aggregate"),
        ],
        &sink,
    );

    assert_matches!(
        result,
        Err(CodegenError::InvalidGeneratedSource { ref file_name, .. }) if file_name == ".g.rs"
    );
    assert!(sink.is_empty(), "nothing is emitted when validation fails");
}

// =============================================================================
// Configuration threading
// =============================================================================

#[test]
fn custom_suffix_drives_filter_and_extractor() {
    let pipeline = Pipeline::new(
        Convention::new("Root"),
        TemplateRenderer::builtin().expect("renderer"),
    );
    let sink = MemorySink::new();

    pipeline
        .run(
            &[
                node(DeclarationKind::Struct, "CustomerRoot"),
                node(DeclarationKind::Struct, "OrderAggregate"),
            ],
            &sink,
        )
        .expect("run");

    assert_eq!(sink.file_names(), vec!["Customer.g.rs".to_string()]);
}

#[test]
fn template_config_defaults_file_name_pattern() {
    let config: TemplateConfig =
        serde_json::from_str(r#"{ "path": "templates/custom.rs.tera" }"#).expect("parse");
    assert_eq!(config.file_name, "{{ feature }}.g.rs");
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn concurrent_process_calls_share_one_sink() {
    let pipeline = Arc::new(Pipeline::builtin().expect("pipeline"));
    let sink = Arc::new(MemorySink::new());

    std::thread::scope(|scope| {
        for name in ["OrderAggregate", "InvoiceAggregate", "OrderAggregate", "ShipmentAggregate"] {
            let pipeline = pipeline.clone();
            let sink = sink.clone();
            scope.spawn(move || {
                let declaration = node(DeclarationKind::Struct, name);
                pipeline
                    .process(&declaration, sink.as_ref())
                    .expect("process");
            });
        }
    });

    assert_eq!(
        sink.file_names(),
        vec![
            "Invoice.g.rs".to_string(),
            "Order.g.rs".to_string(),
            "Shipment.g.rs".to_string()
        ]
    );
}

#[test]
fn sink_trait_object_is_usable() {
    let sink: Box<dyn OutputSink> = Box::new(MemorySink::new());
    sink.emit("Order.g.rs", "text").expect("emit");
    sink.emit("Order.g.rs", "text2").expect("emit");
}
