use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use drain_core::{DrainageStateMachine, FilterCfg, Sample, SampleFilter, ThresholdCfg};

// Synthetic drain: slow linear decline with bounded jitter
fn synth_drain(n: usize, jitter_kg: f64, seed: u32) -> Vec<f64> {
    let mut state = seed.max(1);
    let mut next_unit = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    (0..n)
        .map(|i| {
            let base = 2.2 - 0.008 * i as f64;
            (base + (next_unit() * 2.0 - 1.0) * jitter_kg).max(0.0)
        })
        .collect()
}

pub fn bench_ingest_evaluate(c: &mut Criterion) {
    let mut g = c.benchmark_group("ingest_evaluate");
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE")
        && let Ok(n) = ss.parse::<usize>()
    {
        g.sample_size(n.max(1));
    } else {
        g.sample_size(50);
    }

    let trace = synth_drain(300, 0.01, 0xD1A1);

    for &window in &[3usize, 5, 10] {
        g.bench_function(format!("window_{window}"), |b| {
            b.iter_batched(
                || {
                    let filter = SampleFilter::new(&FilterCfg {
                        window,
                        stable_threshold_kg: 0.05,
                    });
                    let machine = DrainageStateMachine::new(ThresholdCfg::default(), 0.05);
                    (filter, machine)
                },
                |(mut filter, mut machine)| {
                    for (i, &kg) in trace.iter().enumerate() {
                        let fs = filter.ingest(Sample {
                            mass_kg: kg,
                            timestamp_ms: i as u64 * 2000,
                        });
                        black_box(machine.evaluate(black_box(&fs)));
                    }
                    black_box(machine.phase());
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(evaluate, bench_ingest_evaluate);
criterion_main!(evaluate);
