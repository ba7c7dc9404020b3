//! FPMM Pricing Benchmarks — Hot-Path Performance Validation
//!
//! Benchmarks the pure pricing functions that run on every swap and
//! every simulation request.
//!
//! Run with: cargo bench --bench fpmm_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal_macros::dec;

use predata_amm::domain::decimal::sqrt_ceil;
use predata_amm::domain::fpmm::{quote_buy, quote_sell, spot_price};
use predata_amm::domain::swap::Outcome;

/// Benchmark spot price computation for a binary pool.
fn bench_spot_price(c: &mut Criterion) {
    c.bench_function("fpmm_spot_price", |b| {
        b.iter(|| {
            let _price = spot_price(black_box(dec!(1234.5)), black_box(dec!(987.6)));
        });
    });
}

/// Benchmark a BUY quote (fee + complete-set mint + curve rebalance).
fn bench_quote_buy(c: &mut Criterion) {
    c.bench_function("fpmm_quote_buy", |b| {
        b.iter(|| {
            let _quote = quote_buy(
                black_box(dec!(1000)),
                black_box(dec!(1000)),
                black_box(dec!(1000000)),
                black_box(dec!(100)),
                black_box(dec!(0.01)),
                Outcome::Yes,
            );
        });
    });
}

/// Benchmark a SELL quote (quadratic solve including the decimal sqrt).
fn bench_quote_sell(c: &mut Criterion) {
    c.bench_function("fpmm_quote_sell", |b| {
        b.iter(|| {
            let _quote = quote_sell(
                black_box(dec!(1000)),
                black_box(dec!(1000)),
                black_box(dec!(1000000)),
                black_box(dec!(100)),
                black_box(dec!(0.01)),
                Outcome::Yes,
            );
        });
    });
}

/// Benchmark the Newton square root on a sell-sized discriminant.
fn bench_sqrt(c: &mut Criterion) {
    c.bench_function("decimal_sqrt_ceil", |b| {
        b.iter(|| {
            let _root = sqrt_ceil(black_box(dec!(4010000)));
        });
    });
}

criterion_group!(
    benches,
    bench_spot_price,
    bench_quote_buy,
    bench_quote_sell,
    bench_sqrt
);
criterion_main!(benches);
