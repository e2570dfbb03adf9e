//! Benchmarks for the event queue, block processing and synth building.
//!
//! Run with: cargo bench -p cadence-engine --bench scheduler_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cadence_engine::{sum, Context, ContextConfig, Input, Spec, Synth};

fn config() -> ContextConfig {
    ContextConfig {
        sample_rate: 44_100,
        block_size: 1024,
        ..ContextConfig::default()
    }
}

/// Schedule `n` events at scattered times, then drain them block by block.
fn bench_sched_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("sched_and_drain");
    for n in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut ctx = Context::new(config());
                ctx.start();
                for i in 0..n {
                    let t = ((i * 7919) % n) as f64 * 0.001;
                    ctx.sched(t, |_, t| {
                        black_box(t);
                    });
                }
                while ctx.pending_events() > 0 {
                    ctx.advance();
                }
            })
        });
    }
    group.finish();
}

fn bench_sum(c: &mut Criterion) {
    c.bench_function("sum_mixed_64", |b| {
        b.iter(|| {
            let mut ctx = Context::new(config());
            let inputs: Vec<Input> = (0..64)
                .map(|i| match i % 3 {
                    0 => Input::Number(i as f64),
                    1 => Input::Node(ctx.graph_mut().constant(i as f64)),
                    _ => Input::Node(ctx.graph_mut().gain(1.0)),
                })
                .collect();
            let node = sum(inputs).to_node(ctx.graph_mut());
            black_box(node);
        })
    });
}

/// Build, start and release an enveloped oscillator.
fn bench_synth_lifecycle(c: &mut Criterion) {
    c.bench_function("synth_adsr_lifecycle", |b| {
        b.iter(|| {
            let mut ctx = Context::new(config());
            let mut synth = Synth::new(&mut ctx, &[], |b, _| {
                let osc = b.ugen("sin", Spec::new().with("freq", 220.0), vec![])?;
                let env = b.ugen("adsr", Spec::new().with("r", 0.1), vec![osc.outlet()])?;
                Ok(Some(env.outlet()))
            })
            .unwrap();
            synth.start(&mut ctx, 0.0);
            synth.apply(&mut ctx, "release", &[0.5.into()]);
            synth.stop(&mut ctx, 1.0);
            for _ in 0..64 {
                ctx.advance();
            }
            black_box(synth.state());
        })
    });
}

criterion_group!(benches, bench_sched_and_drain, bench_sum, bench_synth_lifecycle);
criterion_main!(benches);
