use criterion::{black_box, criterion_group, criterion_main, Criterion};
use collatz_symbolic::*;
use num_bigint::BigUint;
use num_traits::One;

fn bench_step_small(c: &mut Criterion) {
    let n = BigUint::from(27u64);

    c.bench_function("step n=27", |b| b.iter(|| step(black_box(&n))));
}

fn bench_step_large(c: &mut Criterion) {
    let n = (BigUint::one() << 10000u32) - BigUint::one();

    c.bench_function("step 2^10000-1", |b| b.iter(|| step(black_box(&n))));
}

fn bench_encode_955(c: &mut Criterion) {
    let n = BigUint::from(955u64);

    c.bench_function("encode 955", |b| b.iter(|| encode(black_box(&n))));
}

fn bench_decode_955(c: &mut Criterion) {
    let code: OrbitCode = "(0, AAC, 1131)".parse().unwrap();

    c.bench_function("decode (0, AAC, 1131)", |b| b.iter(|| decode(black_box(&code))));
}

fn bench_classify_a_tower(c: &mut Criterion) {
    // 2·3^500 + 1 は深さ 500 の A 鎖
    let n = BigUint::from(3u32).pow(500) * 2u32 + 1u32;

    c.bench_function("classify 2*3^500+1", |b| b.iter(|| classify(black_box(&n))));
}

fn bench_roundtrip_large(c: &mut Criterion) {
    let n = (BigUint::one() << 10001u32) - BigUint::one();

    c.bench_function("encode+decode 2^10001-1", |b| {
        b.iter(|| {
            let code = encode(black_box(&n)).unwrap();
            decode(&code)
        })
    });
}

fn bench_orbit_word_27(c: &mut Criterion) {
    let n = BigUint::from(27u64);

    c.bench_function("orbit word 27", |b| b.iter(|| orbit_word(black_box(&n))));
}

fn bench_build_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_tree");
    group.sample_size(10);
    for bound in [1_000u64, 10_000] {
        group.bench_function(format!("bound={}", bound), |b| b.iter(|| build_tree(black_box(bound))));
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_step_small,
    bench_step_large,
    bench_encode_955,
    bench_decode_955,
    bench_classify_a_tower,
    bench_roundtrip_large,
    bench_orbit_word_27,
    bench_build_tree,
);
criterion_main!(benches);
