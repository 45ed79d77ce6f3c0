//! Performance benchmarks for netool

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netool::network::{enumerate_hosts, ProbeOutcome};
use netool::scanner::{ScanPlan, WorkerPool};
use netool::utils::parse_port_spec;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Benchmark CIDR expansion
fn bench_cidr_enumeration(c: &mut Criterion) {
    let mut group = c.benchmark_group("cidr_enumeration");

    for cidr in ["192.168.1.0/24", "10.0.0.0/20", "10.0.0.0/16"] {
        group.bench_with_input(BenchmarkId::from_parameter(cidr), cidr, |b, cidr| {
            b.iter(|| black_box(enumerate_hosts(black_box(cidr)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark port specification parsing
fn bench_port_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("port_parsing");

    group.bench_function("default_spec", |b| {
        b.iter(|| black_box(parse_port_spec(black_box("1-1023,3389")).unwrap()))
    });

    group.bench_function("full_range", |b| {
        b.iter(|| black_box(parse_port_spec(black_box("1-65535")).unwrap()))
    });

    group.bench_function("many_tokens", |b| {
        let spec = (1..=2000).map(|p| p.to_string()).collect::<Vec<_>>().join(",");
        b.iter(|| black_box(parse_port_spec(black_box(&spec)).unwrap()))
    });

    group.finish();
}

/// Benchmark pool overhead with a probe that answers immediately
fn bench_worker_pool(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("worker_pool");
    group.sample_size(20);

    for concurrency in [1usize, 10, 100, 500] {
        group.bench_with_input(
            BenchmarkId::new("instant_probe_4096_jobs", concurrency),
            &concurrency,
            |b, &concurrency| {
                b.iter(|| {
                    rt.block_on(async {
                        let plan = ScanPlan::new((1u16..=4096).collect(), concurrency, Duration::from_millis(100));
                        let open = WorkerPool::new(10)
                            .run(plan, |port, _timeout| async move {
                                ProbeOutcome::from((port % 16 == 0).then_some(port))
                            })
                            .await;
                        black_box(open)
                    })
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_cidr_enumeration, bench_port_parsing, bench_worker_pool);
criterion_main!(benches);
