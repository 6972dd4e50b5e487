//! Benchmarks for hydronet

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hydronet::*;

/// Build a synthetic district: `basins` root canals, each feeding
/// `devices` gates with `fields` fields apiece.
fn synthetic_district(basins: usize, devices: usize, fields: usize) -> Network {
    let mut net = Network::new();
    for b in 0..basins {
        let canal = format!("MC{b}");
        net.add_component(&canal, "canal").unwrap();
        for d in 0..devices {
            let gate = format!("ZT{b}_{d}");
            net.add_component(&gate, "gate").unwrap();
            net.add_connection(&canal, &gate).unwrap();
            for f in 0..fields {
                let field = format!("F{b}_{d}_{f}");
                net.add_component(&field, "field").unwrap();
                net.add_connection(&gate, &field).unwrap();
            }
        }
    }
    net
}

fn benchmark_network_building(c: &mut Criterion) {
    c.bench_function("build_district", |b| {
        b.iter(|| synthetic_district(black_box(10), 5, 4))
    });

    let mut group = c.benchmark_group("build_by_size");
    for basins in [5, 20, 50].iter() {
        let nodes = basins * (1 + 5 * (1 + 4));
        group.throughput(Throughput::Elements(nodes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(basins), basins, |b, &basins| {
            b.iter(|| synthetic_district(basins, 5, 4))
        });
    }
    group.finish();
}

fn benchmark_strahler(c: &mut Criterion) {
    let net = synthetic_district(20, 5, 4);

    c.bench_function("strahler_analyze", |b| {
        b.iter(|| {
            let mut analyzer = StrahlerAnalyzer::new();
            analyzer.analyze(black_box(&net));
            analyzer.max_order()
        })
    });

    let mut group = c.benchmark_group("strahler_by_size");
    for basins in [5, 20, 50].iter() {
        let net = synthetic_district(*basins, 5, 4);
        group.bench_with_input(BenchmarkId::from_parameter(basins), &net, |b, net| {
            b.iter(|| {
                let mut analyzer = StrahlerAnalyzer::new();
                analyzer.analyze(black_box(net));
                analyzer.max_order()
            })
        });
    }
    group.finish();
}

fn benchmark_block_assembly(c: &mut Criterion) {
    c.bench_function("detect_blocks_and_hierarchy", |b| {
        b.iter(|| {
            let mut net = synthetic_district(20, 5, 4);
            let mut asm = BlockAssembler::new();
            asm.detect_blocks(&mut net).unwrap();
            asm.detect_confluences(&net).unwrap();
            asm.compute_hierarchy(&net);
            asm.block_hierarchy().len()
        })
    });
}

fn benchmark_validation(c: &mut Criterion) {
    let mut net = synthetic_district(10, 4, 3);
    StrahlerAnalyzer::new().analyze_and_apply(&mut net);
    let mut asm = BlockAssembler::new();
    asm.detect_blocks(&mut net).unwrap();
    asm.compute_hierarchy(&net);
    let engine = ValidationEngine::with_defaults();

    c.bench_function("validate_district", |b| {
        b.iter(|| engine.validate(black_box(&net), black_box(&asm)).len())
    });
}

fn benchmark_full_analysis(c: &mut Criterion) {
    c.bench_function("analyzer_run", |b| {
        b.iter(|| {
            let mut net = synthetic_district(10, 4, 3);
            let mut analyzer = NetworkAnalyzer::new();
            analyzer.run(&mut net).unwrap();
            analyzer.steps().len()
        })
    });
}

criterion_group!(
    benches,
    benchmark_network_building,
    benchmark_strahler,
    benchmark_block_assembly,
    benchmark_validation,
    benchmark_full_analysis
);
criterion_main!(benches);
