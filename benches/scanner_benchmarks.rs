//! Performance benchmarks for the layout scanner and the parser.
//!
//! The same generated programs are scanned in both surface syntaxes, so the
//! two normalizers can be compared directly:
//! - Size-based: 10 to 1000 methods
//! - Layout: deep nesting, long continuation lines, collection literals
//! - Parsing: element tree to AST

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use latte::{Bump, ScannerMode, parse, scan};
use std::fmt::Write;
use std::hint::black_box;

/// `methods` small methods in indentation syntax.
fn indented_program(methods: usize) -> String {
    let mut out = String::from("class Bench\n");
    for i in 0..methods {
        let _ = write!(
            out,
            "  def m{i}(x:int):int\n    y = x * {i}\n    if y > 10\n      y = y - 1\n    return y\n"
        );
    }
    out
}

/// The same program in brace syntax.
fn braced_program(methods: usize) -> String {
    let mut out = String::from("class Bench {\n");
    for i in 0..methods {
        let _ = write!(
            out,
            "  def m{i}(x:int):int {{\n    y = x * {i}\n    if y > 10 {{\n      y = y - 1\n    }}\n    return y\n  }}\n"
        );
    }
    out.push_str("}\n");
    out
}

fn nested_program(depth: usize) -> String {
    let mut out = String::from("class Deep\n  def f(x:int):int\n");
    for level in 0..depth {
        let pad = "  ".repeat(level + 2);
        let _ = writeln!(out, "{pad}if x > {level}");
    }
    let _ = writeln!(out, "{}return x", "  ".repeat(depth + 2));
    out.push_str("    return 0\n");
    out
}

fn literal_program(entries: usize) -> String {
    let mut out = String::from("class Literals\n  def f()\n    m = [\n");
    for i in 0..entries {
        let _ = writeln!(out, "      \"k{i}\": {i}");
    }
    out.push_str("    ]\n    l = [");
    for i in 0..entries {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{i}");
    }
    out.push_str("]\n");
    out
}

/// Benchmark scanning across program sizes in both syntaxes.
fn size_based_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner/file_sizes");

    for methods in [10, 100, 1000] {
        let indented = indented_program(methods);
        group.throughput(Throughput::Bytes(indented.len() as u64));
        group.bench_function(format!("indentation_{methods}_methods"), |b| {
            b.iter(|| {
                let arena = Bump::new();
                let tree = scan(black_box(&indented), ScannerMode::Indentation, &arena).unwrap();
                black_box(tree.lines.len())
            });
        });

        let braced = braced_program(methods);
        group.throughput(Throughput::Bytes(braced.len() as u64));
        group.bench_function(format!("brace_{methods}_methods"), |b| {
            b.iter(|| {
                let arena = Bump::new();
                let tree = scan(black_box(&braced), ScannerMode::Brace, &arena).unwrap();
                black_box(tree.lines.len())
            });
        });
    }

    group.finish();
}

/// Benchmark layout features that stress the indentation stack and
/// continuation handling.
fn layout_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner/layout");

    let nested = nested_program(64);
    group.throughput(Throughput::Bytes(nested.len() as u64));
    group.bench_function("deep_nesting", |b| {
        b.iter(|| {
            let arena = Bump::new();
            let tree = scan(black_box(&nested), ScannerMode::Indentation, &arena).unwrap();
            black_box(tree.lines.len())
        });
    });

    let literals = literal_program(500);
    group.throughput(Throughput::Bytes(literals.len() as u64));
    group.bench_function("collection_literals", |b| {
        b.iter(|| {
            let arena = Bump::new();
            let tree = scan(black_box(&literals), ScannerMode::Indentation, &arena).unwrap();
            black_box(tree.lines.len())
        });
    });

    group.finish();
}

/// Benchmark the parser alone on a pre-scanned tree.
fn parser_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser/file_sizes");

    for methods in [10, 100, 1000] {
        let source = indented_program(methods);
        let arena = Bump::new();
        let tree = scan(&source, ScannerMode::Indentation, &arena).unwrap();
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(format!("parse_{methods}_methods"), |b| {
            b.iter(|| {
                let unit = parse(black_box(&tree)).unwrap();
                black_box(unit.types.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, size_based_benchmarks, layout_benchmarks, parser_benchmarks);
criterion_main!(benches);
