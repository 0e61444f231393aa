use criterion::{criterion_group, criterion_main, Criterion};
use sgadapt::{index::compose, utilities::hash::Unique};

fn build_batch(ni: usize, nn: usize) -> Vec<u64>
{
    // Plenty of repeats so that both branches of the filter are hit.
    let mut seed = 0x9E37_79B9_7F4A_7C15_u64;
    let mut indices = Vec::with_capacity(ni * nn);
    for _ in 0..ni * nn
    {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        indices.push(compose((seed % 4) as u32, (seed >> 32) as u32 % 8));
    }
    indices
}

fn run_distil(c: &mut Criterion)
{
    let ni = 20;
    let batch = build_batch(ni, 1000);
    c.bench_function("distil 20d", |b| b.iter(||
    {
        let mut unique = Unique::new(ni);
        unique.distil(batch.clone())
    }));
}

criterion_group!(benches, run_distil);
criterion_main!(benches);
