//! Benchmarks for prompt template rendering
//!
//! This benchmark measures:
//! - Parsing cost of templates with a growing number of placeholders
//! - Rendering through a precompiled template vs the global compile cache
//! - Simulated embedding and top-k ranking used by example search

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashMap;

use vertexai_preview::embeddings::{find_most_similar, simulated_embedding, SIMULATED_DIMENSIONS};
use vertexai_preview::prompts::{render, PromptTemplate, ValidationMode};

fn template_with(placeholders: usize) -> (String, HashMap<String, String>) {
    let mut template = String::from("You are a helpful assistant. ");
    let mut vars = HashMap::new();
    for i in 0..placeholders {
        template.push_str(&format!("Field {i} is {{var_{i}}}. "));
        vars.insert(format!("var_{i}"), format!("value number {i}"));
    }
    (template, vars)
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_compile");
    for size in [1usize, 10, 100] {
        let (template, _) = template_with(size);
        group.throughput(Throughput::Bytes(template.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &template, |b, t| {
            b.iter(|| PromptTemplate::compile(black_box(t.as_str())).unwrap())
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_render");
    for size in [1usize, 10, 100] {
        let (template, vars) = template_with(size);
        let compiled = PromptTemplate::compile(template.as_str()).unwrap();
        group.bench_with_input(BenchmarkId::new("precompiled", size), &vars, |b, v| {
            b.iter(|| compiled.render(black_box(v), ValidationMode::Strict).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("global_cache", size), &vars, |b, v| {
            b.iter(|| render(black_box(&template), black_box(v), ValidationMode::Strict).unwrap())
        });
    }
    group.finish();
}

fn bench_example_search(c: &mut Criterion) {
    let keys: Vec<String> = (0..500)
        .map(|i| format!("how do I configure option {} for service {}", i, i % 17))
        .collect();
    let candidates: Vec<Vec<f32>> = keys
        .iter()
        .map(|k| simulated_embedding(k, SIMULATED_DIMENSIONS))
        .collect();
    let query = simulated_embedding("configure option 42", SIMULATED_DIMENSIONS);

    c.bench_function("simulated_embedding", |b| {
        b.iter(|| simulated_embedding(black_box("how do I configure option 7"), SIMULATED_DIMENSIONS))
    });
    c.bench_function("find_most_similar_500", |b| {
        b.iter(|| find_most_similar(black_box(&query), black_box(&candidates), 10).unwrap())
    });
}

criterion_group!(benches, bench_compile, bench_render, bench_example_search);
criterion_main!(benches);
