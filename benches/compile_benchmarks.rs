//! Performance benchmarks for the batch compiler.
//!
//! Measures the full pipeline (scan, parse, headers, resolution, bytecode
//! generation) across different workloads:
//! - Size-based: 10 to 1000 methods in one unit
//! - Batch: many small units referring to each other
//! - Feature-specific: lambdas, `synchronized`, primitive arithmetic
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to collect phase timings:
//!
//! ```bash
//! cargo bench --bench compile_benchmarks --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use latte::Compiler;
use std::fmt::Write;
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
use std::collections::HashMap;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

/// Initialize puffin profiler.
#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each benchmark iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// Sum top-level scope durations per scope name over the recent frames.
#[cfg(feature = "profile-with-puffin")]
fn print_profiling_stats() {
    use puffin::Reader;

    let Some(frame_view) = FRAME_VIEW.get() else {
        println!("Profiler not initialized");
        return;
    };
    let view = frame_view.lock();
    let scope_collection = view.scope_collection();

    let mut timings: HashMap<String, i64> = HashMap::new();
    let mut frames = 0i64;
    for frame in view.recent_frames() {
        frames += 1;
        let Ok(unpacked) = frame.unpacked() else {
            continue;
        };
        for (_thread, stream_info) in unpacked.thread_streams.iter() {
            let Ok(scopes) = Reader::from_start(&stream_info.stream).read_top_scopes() else {
                continue;
            };
            for scope in scopes {
                if let Some(details) = scope_collection.fetch_by_id(&scope.id) {
                    *timings.entry(details.name().to_string()).or_insert(0) += scope.record.duration_ns;
                }
            }
        }
    }

    println!("\n=== Profiling Summary ({frames} frames) ===");
    let mut entries: Vec<_> = timings.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    for (name, ns) in entries {
        let avg = if frames > 0 { ns / frames } else { ns };
        println!("  {:30} {:>10.2?} avg", name, std::time::Duration::from_nanos(avg as u64));
    }
    println!("=====================================\n");
}

#[cfg(not(feature = "profile-with-puffin"))]
fn print_profiling_stats() {}

fn arithmetic_unit(methods: usize) -> String {
    let mut out = String::from("class Arith(base:int)\n");
    for i in 0..methods {
        let _ = write!(
            out,
            "  def m{i}(x:int, y:long):long\n    z = x * {i} + base\n    while z > 100\n      z = z / 2\n    return z + y\n"
        );
    }
    out
}

fn lambda_unit(lambdas: usize) -> String {
    let mut out = String::from("import java::util::function::_\nclass Lambdas(k:int)\n");
    for i in 0..lambdas {
        let _ = writeln!(out, "  def l{i}():IntUnaryOperator = (x) -> x + k + {i}");
        let _ = writeln!(out, "  def r{i}():Runnable = () -> System.out.println({i})");
    }
    out
}

fn sync_unit(blocks: usize) -> String {
    let mut out = String::from("class Locks\n");
    for i in 0..blocks {
        let _ = write!(
            out,
            "  def s{i}(a, b):int\n    synchronized(a, b)\n      System.out.println({i})\n    return {i}\n"
        );
    }
    out
}

/// `units` classes, each calling into the previous one.
fn batch(units: usize) -> Vec<(String, String)> {
    (0..units)
        .map(|i| {
            let source = if i == 0 {
                "package p0\nclass C0\n  def value():int = 1\n".to_string()
            } else {
                let prev = i - 1;
                format!("package p{i}\nimport p{prev}::C{prev}\nclass C{i}\n  def value():int = C{prev}().value() + 1\n")
            };
            (format!("p{i}/C{i}.lt"), source)
        })
        .collect()
}

/// Benchmark the pipeline across unit sizes.
fn size_based_benchmarks(c: &mut Criterion) {
    setup_profiler();

    let mut group = c.benchmark_group("compile/file_sizes");
    for methods in [10, 100, 1000] {
        let source = arithmetic_unit(methods);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(format!("arithmetic_{methods}_methods"), |b| {
            let mut compiler = Compiler::default();
            b.iter(|| {
                let classes = compiler.compile(&[("Arith.lt", black_box(source.as_str()))]).unwrap();
                end_profiling_frame();
                black_box(classes.len())
            });
        });
    }
    group.finish();

    print_profiling_stats();
}

/// Benchmark batches of units that see each other.
fn batch_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/batches");
    for units in [10, 100] {
        let sources = batch(units);
        let bytes: usize = sources.iter().map(|(_, s)| s.len()).sum();
        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_function(format!("chain_{units}_units"), |b| {
            let mut compiler = Compiler::default();
            b.iter(|| {
                let classes = compiler.compile(black_box(&sources)).unwrap();
                end_profiling_frame();
                black_box(classes.len())
            });
        });
    }
    group.finish();
}

/// Benchmark lambda synthesis and monitor bookkeeping.
fn feature_specific_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/features");

    let lambdas = lambda_unit(100);
    group.throughput(Throughput::Bytes(lambdas.len() as u64));
    group.bench_function("lambdas_200", |b| {
        let mut compiler = Compiler::default();
        b.iter(|| {
            let classes = compiler.compile(&[("Lambdas.lt", black_box(lambdas.as_str()))]).unwrap();
            end_profiling_frame();
            black_box(classes.len())
        });
    });

    let locks = sync_unit(100);
    group.throughput(Throughput::Bytes(locks.len() as u64));
    group.bench_function("synchronized_100", |b| {
        let mut compiler = Compiler::default();
        b.iter(|| {
            let classes = compiler.compile(&[("Locks.lt", black_box(locks.as_str()))]).unwrap();
            end_profiling_frame();
            black_box(classes.len())
        });
    });

    group.finish();
}

criterion_group!(benches, size_based_benchmarks, batch_benchmarks, feature_specific_benchmarks);
criterion_main!(benches);
