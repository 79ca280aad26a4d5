use common::{Dimensions, Money};
use criterion::{Criterion, criterion_group, criterion_main};
use shipping::{PackingLine, PricingOrigin, PricingSnapshot, bundled_default, plan, quote_with};

fn cart(lines: usize) -> Vec<PackingLine> {
    (0..lines)
        .map(|i| {
            PackingLine::new(
                format!("SKU-{i:04}"),
                0.5 + (i % 7) as f64,
                Dimensions::new(10.0 + (i % 5) as f64, 12.0, 8.0),
                1 + (i % 3) as u32,
            )
        })
        .collect()
}

fn bench_plan(c: &mut Criterion) {
    let lines = cart(50);
    let document = bundled_default();
    let limits = document.carriers[1].effective_limits(&document.carriers[1].formats[0]);

    c.bench_function("shipping/plan_50_lines", |b| {
        b.iter(|| plan(&lines, &limits).unwrap());
    });
}

fn bench_quote(c: &mut Criterion) {
    let lines = cart(50);
    let snapshot = PricingSnapshot {
        version: 1,
        origin: PricingOrigin::BundledDefault,
        loaded_at: chrono::Utc::now(),
        document: bundled_default(),
    };

    c.bench_function("shipping/quote_50_lines", |b| {
        b.iter(|| quote_with(&snapshot, &lines, Money::from_cents(10_000)).unwrap());
    });
}

criterion_group!(benches, bench_plan, bench_quote);
criterion_main!(benches);
