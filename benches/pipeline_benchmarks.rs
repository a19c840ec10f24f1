//! Pipeline Benchmarks
//!
//! Rendering cold and memoized, batch runs over many declarations, and a
//! full scan of a synthetic source tree.

use aggregate_codegen::codegen::{MemorySink, Pipeline};
use aggregate_codegen::declaration::{DeclarationKind, DeclarationNode, SourceScanner};
use aggregate_codegen::template::TemplateRenderer;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::fs;

fn declarations(count: usize) -> Vec<DeclarationNode> {
    (0..count)
        .flat_map(|i| {
            [
                DeclarationNode::new(DeclarationKind::Struct, format!("Feature{i}Aggregate")),
                DeclarationNode::new(DeclarationKind::Struct, format!("Feature{i}AggregateId")),
                DeclarationNode::new(DeclarationKind::Field, "aggregate"),
            ]
        })
        .collect()
}

fn bench_render(c: &mut Criterion) {
    let renderer = TemplateRenderer::builtin().unwrap();

    c.bench_function("render_builtin_template", |b| {
        b.iter(|| black_box(renderer.render(black_box("Order")).unwrap()))
    });
}

fn bench_pipeline_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_run");

    for count in [10, 100, 500] {
        let nodes = declarations(count);

        group.bench_with_input(BenchmarkId::new("cold", count), &nodes, |b, nodes| {
            let pipeline = Pipeline::builtin().unwrap();
            b.iter(|| {
                pipeline.clear_cache();
                let sink = MemorySink::new();
                black_box(pipeline.run(nodes, &sink).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("memoized", count), &nodes, |b, nodes| {
            let pipeline = Pipeline::builtin().unwrap();
            pipeline.run(nodes, &MemorySink::new()).unwrap();
            b.iter(|| {
                let sink = MemorySink::new();
                black_box(pipeline.run(nodes, &sink).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let root = tempfile::tempdir().unwrap();
    for i in 0..200 {
        fs::write(
            root.path().join(format!("feature_{i}.rs")),
            format!(
                "pub struct Feature{i}Aggregate {{ id: Feature{i}AggregateId }}\n\
                 pub struct Feature{i}AggregateId(String);\n\
                 pub enum Feature{i}Event {{ Created, Closed }}\n"
            ),
        )
        .unwrap();
    }

    let mut group = c.benchmark_group("source_scan");

    group.bench_function("cold", |b| {
        b.iter(|| {
            let scanner =
                SourceScanner::new(vec![root.path().to_path_buf()], &["**/*.rs"], &[]).unwrap();
            black_box(scanner.scan().unwrap())
        })
    });

    group.bench_function("cached", |b| {
        let scanner =
            SourceScanner::new(vec![root.path().to_path_buf()], &["**/*.rs"], &[]).unwrap();
        scanner.scan().unwrap();
        b.iter(|| black_box(scanner.scan().unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_render, bench_pipeline_run, bench_scan);
criterion_main!(benches);
