// Accounting hot-path benchmarks for the yvault engine.
//
// Covers share conversion at different supply sizes, credit evaluation,
// and full settlement planning for gain and loss reports.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use yvault_protocol::math;
use yvault_protocol::vault::{
    plan_settlement, CreditLimits, SettlementRequest, ShareAccounting,
    StrategyParams, StrategyRecord,
};
use yvault_protocol::Address;

fn record(debt: u128) -> StrategyRecord {
    let mut r = StrategyRecord::new(
        Address::repeat_byte(7),
        StrategyParams {
            debt_limit: u128::MAX / 4,
            rate_limit_per_block: 1_000_000_000,
            performance_fee_bps: 50,
            activation_block: 0,
        },
    );
    r.debt.outstanding_debt = debt;
    r
}

fn bench_share_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("shares/convert");
    for supply in [1_000u128, 1_000_000_000, 1_000_000 * 10u128.pow(18)] {
        let acct = ShareAccounting::new(supply + supply / 10, supply, 18);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(supply), &acct, |b, acct| {
            b.iter(|| {
                let shares = acct.shares_for_deposit(12_345_678).unwrap_or(0);
                acct.assets_for_shares(shares)
            });
        });
    }
    group.finish();
}

fn bench_price_per_share(c: &mut Criterion) {
    let acct = ShareAccounting::new(1_100_000_000_000, 1_000_000_000_000, 18);
    c.bench_function("shares/price_per_share", |b| {
        b.iter(|| acct.price_per_share());
    });
}

fn bench_mul_div(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let inputs: Vec<(u128, u128, u128)> = (0..1_024)
        .map(|_| (rng.gen(), rng.gen(), rng.gen_range(1..u128::MAX)))
        .collect();

    c.bench_function("math/mul_div_1024", |b| {
        b.iter(|| {
            inputs
                .iter()
                .filter_map(|&(v, n, d)| math::mul_div(v, n, d).ok())
                .count()
        });
    });
}

fn bench_credit(c: &mut Criterion) {
    let r = record(400_000);
    c.bench_function("allocator/credit_available", |b| {
        b.iter(|| CreditLimits::evaluate(&r, 400_000, 10_000_000, 1_000, false).available());
    });
}

fn bench_settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("settlement/plan");

    let gain = record(1_000_000);
    let gain_request = SettlementRequest {
        total_assets_held: 1_200_000,
        debt_payment: 200_000,
        credit_requested: 50_000,
    };
    group.bench_function("gain", |b| {
        b.iter(|| plan_settlement(&gain, &gain_request, 10_000_000, 1_000, 100, false));
    });

    let loss = record(1_000_000);
    let loss_request = SettlementRequest {
        total_assets_held: 700_000,
        debt_payment: 0,
        credit_requested: 0,
    };
    group.bench_function("loss", |b| {
        b.iter(|| plan_settlement(&loss, &loss_request, 10_000_000, 0, 100, false));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_share_conversion,
    bench_price_per_share,
    bench_mul_div,
    bench_credit,
    bench_settlement
);
criterion_main!(benches);
