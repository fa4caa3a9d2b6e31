use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use std::time::Duration;

use festa_api::gateways::stripe::sign_payload;
use festa_api::services::shipping_quote::{
    chargeable_weight, quote_options, sanitize_zip, PackageDimensions,
};

fn sample_package() -> PackageDimensions {
    PackageDimensions {
        weight_grams: Decimal::from(500),
        length_cm: Decimal::from(30),
        width_cm: Decimal::from(20),
        height_cm: Decimal::from(10),
    }
}

// Full quote computation across the four zones
fn quote_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("shipping_quote");
    let package = sample_package();

    for (zone, destination) in [
        (1u32, "04538133"),
        (2, "13010100"),
        (3, "29010100"),
        (4, "69000000"),
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(zone),
            destination,
            |b, destination| {
                b.iter(|| {
                    quote_options(
                        black_box("01310100"),
                        black_box(destination),
                        black_box(&package),
                    )
                    .expect("valid quote")
                });
            },
        );
    }

    group.finish();
}

// CEP sanitization, the hot path of every quote and checkout request
fn sanitize_benchmark(c: &mut Criterion) {
    c.bench_function("sanitize_zip", |b| {
        b.iter(|| sanitize_zip(black_box(" 01.310-100 ")).expect("valid cep"));
    });
}

// Volumetric-vs-actual weight selection
fn chargeable_weight_benchmark(c: &mut Criterion) {
    let package = sample_package();

    c.bench_function("chargeable_weight", |b| {
        b.iter(|| chargeable_weight(black_box(&package)));
    });
}

// HMAC signature over webhook payloads of realistic sizes
fn webhook_signature_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("webhook_signature");

    for size in [256usize, 1024, 4096] {
        let payload = "x".repeat(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                sign_payload(
                    black_box("whsec_benchmark_secret"),
                    black_box(1_700_000_000),
                    black_box(payload.as_bytes()),
                )
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets =
        quote_benchmark,
        sanitize_benchmark,
        chargeable_weight_benchmark,
        webhook_signature_benchmark
}

criterion_main!(benches);
