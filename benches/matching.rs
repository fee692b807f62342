//! Benchmarks for delimiter matching.
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use delimit_buffer::{Region, TextBuffer};
use delimit_core::{Config, MatchOptions, Matcher, build_rules};

/// Generates nested source-like text for benchmarking.
fn generate_source(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("    let v{i} = f(a[{i}], {{ g(\"x)\", (b, c)) }});\n"))
        .collect()
}

/// Benchmarks a single cursor in the middle of growing buffers.
fn bench_single_cursor(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_cursor");
    let rules = build_rules("rust", &Config::default().definitions());

    for size in [100, 1000, 10000].iter() {
        let text = generate_source(*size);
        let cursor = Region::point(text.len() / 2);

        group.bench_with_input(BenchmarkId::new("threshold", size), &text, |b, text| {
            let options = MatchOptions::default();
            b.iter(|| delimit_core::match_cursor(text.as_str(), &rules, black_box(cursor), &options))
        });

        group.bench_with_input(BenchmarkId::new("whole_buffer", size), &text, |b, text| {
            let options = MatchOptions {
                search_threshold: None,
                ..MatchOptions::default()
            };
            b.iter(|| delimit_core::match_cursor(text.as_str(), &rules, black_box(cursor), &options))
        });
    }

    group.finish();
}

/// Benchmarks many cursors through the configured matcher.
fn bench_selections(c: &mut Criterion) {
    let mut group = c.benchmark_group("selections");
    let matcher = Matcher::default();
    let buffer = TextBuffer::from(generate_source(2000));
    let len = buffer.len_bytes();

    for count in [1, 10, 100].iter() {
        let cursors: Vec<Region> = (0..*count)
            .map(|i| Region::point(len * (i + 1) / (count + 1)))
            .collect();

        group.bench_with_input(BenchmarkId::new("cursors", count), &cursors, |b, cursors| {
            b.iter(|| matcher.match_selections(&buffer, "rust", black_box(cursors)))
        });
    }

    group.finish();
}

/// Benchmarks building a rule set from the default configuration.
fn bench_rule_build(c: &mut Criterion) {
    let definitions = Config::default().definitions();
    c.bench_function("build_rules", |b| {
        b.iter(|| build_rules(black_box("html"), &definitions))
    });
}

criterion_group!(benches, bench_single_cursor, bench_selections, bench_rule_build);
criterion_main!(benches);
