//! Performance benchmarks for the crossover backtester.
//!
//! Run with: cargo bench

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stockcross::data::PriceSeries;
use stockcross::moving_average::{rolling_mean, rolling_mean_values};
use stockcross::simulator::simulate;
use stockcross::types::Bar;
use stockcross::walkforward::{
    default_folds, default_grid, WalkForwardConfig, WalkForwardValidator,
};

/// Generate synthetic daily bars for benchmarking.
fn generate_series(count: usize) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2019, 12, 1).unwrap();
    let mut price = 30.0;
    let bars = (0..count)
        .map(|i| {
            let noise = ((i as f64 * 0.7).sin() * 0.4 + (i as f64 * 1.3).cos()) * 0.2;
            price += 0.0005 * price + noise;
            price = price.max(5.0);
            Bar::from_open(start + chrono::Duration::days(i as i64), price)
        })
        .collect();
    PriceSeries::new("BENCH", bars).unwrap()
}

fn bench_moving_averages(c: &mut Criterion) {
    let series = generate_series(2000);

    let mut group = c.benchmark_group("moving_average");
    for window in [10, 50, 200].iter() {
        group.bench_with_input(BenchmarkId::new("rolling_mean", window), window, |b, &w| {
            b.iter(|| rolling_mean(black_box(&series), w))
        });
    }
    group.finish();
}

fn bench_simulator(c: &mut Criterion) {
    let series = generate_series(2000);
    let opens = series.opens();
    let short = rolling_mean_values(&opens, 20).unwrap();
    let long = rolling_mean_values(&opens, 100).unwrap();

    c.bench_function("simulate_2000_bars", |b| {
        b.iter(|| simulate(black_box(&opens), &short, &long, 100.0))
    });
}

fn bench_walkforward(c: &mut Criterion) {
    // Calendar days from 2019-12-01 past 2025-07-01.
    let series = generate_series(2050);
    let folds = default_folds().unwrap();
    let grid = default_grid();

    let mut group = c.benchmark_group("walkforward");
    group.sample_size(20);

    for parallel in [false, true] {
        let config = WalkForwardConfig {
            parallel,
            ..WalkForwardConfig::default()
        };
        let validator = WalkForwardValidator::new(config);
        let name = if parallel { "parallel" } else { "sequential" };
        group.bench_function(name, |b| {
            b.iter(|| validator.run(black_box(&series), &folds, &grid))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_moving_averages,
    bench_simulator,
    bench_walkforward
);

criterion_main!(benches);
