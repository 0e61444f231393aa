use criterion::{criterion_group, criterion_main, Criterion};
use sgadapt::{algorithms::global::{GlobalConfig, GlobalStrategy}, basis::linear, errors::AdaptError, grids::equidistant, interpolator::Interpolator, surrogate::Surrogate, target::BasicTarget};

fn branin(x: &[f64], y: &mut [f64])
{
    use std::f64::consts::PI;
    let (a, b) = (15.0 * x[0] - 5.0, 15.0 * x[1]);
    y[0] = (b - 5.1 / (4.0 * PI * PI) * a * a + 5.0 / PI * a - 6.0).powi(2) + 10.0 * (1.0 - 1.0 / (8.0 * PI)) * a.cos() + 10.0;
}

fn build_branin() -> Result<Surrogate, AdaptError>
{
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);
    let mut strategy = GlobalStrategy::new(GlobalConfig::new(2, 1, 8, 1e-3, 1e-3), equidistant::Closed)?;
    let mut target = BasicTarget::new(2, 1, branin);
    interpolator.compute(&mut target, &mut strategy)
}

fn run_branin(c: &mut Criterion)
{
    c.bench_function("branin", |b| b.iter(|| build_branin().unwrap()));
}

fn run_evaluate(c: &mut Criterion)
{
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);
    let surrogate = build_branin().unwrap();
    let points: Vec<f64> = (0..2000).map(|i| (i % 97) as f64 / 97.0).collect();
    c.bench_function("branin evaluate", |b| b.iter(|| interpolator.evaluate(&surrogate, &points)));
}

criterion_group!(benches, run_branin, run_evaluate);
criterion_main!(benches);
