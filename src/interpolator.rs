use rayon::{iter::{IndexedParallelIterator, ParallelIterator}, slice::{ParallelSlice, ParallelSliceMut}, ThreadPool, ThreadPoolBuilder};

use crate::{algorithms::{strategy::Strategy, support::{approximate, measure, subtract}}, basis::base::Basis, errors::{AdaptError, AdaptResult}, grids::base::Grid, index::levelize, surrogate::Surrogate, target::{Location, Progress, Target}};

///
/// Builds surrogates by alternating between a strategy, which picks nodes, and
/// a target, which evaluates them.
///
/// With `workers == 0` target evaluations run on rayon's global pool;
/// otherwise a dedicated pool with that many threads is built per call.
///
#[derive(Clone, Debug)]
pub struct Interpolator<G: Grid, B: Basis>
{
    grid: G,
    basis: B,
    workers: usize,
}

fn install<R: Send>(pool: Option<&ThreadPool>, job: impl FnOnce() -> R + Send) -> R
{
    match pool
    {
        Some(pool) => pool.install(job),
        None => job(),
    }
}

fn invoke<T: Target>(target: &T, nodes: &[f64], ni: usize, no: usize) -> Vec<f64>
{
    let mut values = vec![0.0; nodes.len() / ni * no];
    nodes.par_chunks_exact(ni).zip(values.par_chunks_exact_mut(no)).for_each(
        |(point, value)|
        {
            target.compute(point, value);
        }
    );
    values
}

impl<G: Grid, B: Basis> Interpolator<G, B>
{
    pub fn new(grid: G, basis: B) -> Self
    {
        Self { grid, basis, workers: 0 }
    }

    pub fn with_workers(mut self, workers: usize) -> Self
    {
        self.workers = workers;
        self
    }

    pub fn grid(&self) -> &G
    {
        &self.grid
    }

    pub fn basis(&self) -> &B
    {
        &self.basis
    }

    fn pool(&self) -> AdaptResult<Option<ThreadPool>>
    {
        if self.workers == 0
        {
            return Ok(None);
        }
        ThreadPoolBuilder::new().num_threads(self.workers).build()
            .map(Some)
            .map_err(|e| AdaptError::ThreadPool(e.to_string()))
    }

    ///
    /// Builds a surrogate of `target`, letting `strategy` decide where to
    /// refine. The strategy must be fresh.
    ///
    pub fn compute<T: Target, S: Strategy>(&self, target: &mut T, strategy: &mut S) -> AdaptResult<Surrogate>
    {
        let (ni, no) = target.dimensions();
        if ni == 0 || no == 0
        {
            return Err(AdaptError::Config(format!("target must have inputs and outputs, got {ni} and {no}")));
        }
        if ni != strategy.num_inputs()
        {
            return Err(AdaptError::DimensionMismatch { expected: strategy.num_inputs(), found: ni });
        }
        let pool = self.pool()?;

        let mut surrogate = Surrogate::new(ni, no);
        let mut integral = vec![0.0; no];
        let mut refined = 0;
        let mut next = Some(strategy.first());
        while let Some(mut state) = next.take()
        {
            if !strategy.check(&state, &surrogate)
            {
                break;
            }
            let nn = state.indices.len() / ni;
            let level = levelize(&state.indices, ni).into_iter().fold(surrogate.level, u64::max);
            let mut progress = Progress { level, active: nn, passive: surrogate.nodes, refined, integral: integral.clone() };
            if !target.before(&progress)
            {
                break;
            }

            state.volumes = measure(&self.basis, &state.indices, ni);
            state.nodes = self.grid.compute(&state.indices);
            state.values =
            {
                let target: &T = target;
                install(pool.as_ref(), || invoke(target, &state.nodes, ni, no))
            };
            if state.values.iter().any(|value| !value.is_finite())
            {
                log::warn!("target produced non-finite values at level {level}");
            }
            let estimates = install(pool.as_ref(), ||
                approximate(&self.basis, &surrogate.indices, &surrogate.surpluses, &state.nodes, ni, no));
            state.surpluses = subtract(&state.values, &estimates);

            state.scores = Vec::with_capacity(nn);
            let mut positive = 0;
            for i in 0..nn
            {
                let location = Location
                {
                    index: &state.indices[i * ni..(i + 1) * ni],
                    value: &state.values[i * no..(i + 1) * no],
                    surplus: &state.surpluses[i * no..(i + 1) * no],
                    volume: state.volumes[i],
                };
                let score = target.score(&location).unwrap_or_else(|| strategy.score(&location));
                if score > 0.0
                {
                    positive += 1;
                }
                for (total, surplus) in integral.iter_mut().zip(location.surplus)
                {
                    *total += surplus * location.volume;
                }
                state.scores.push(score);
            }
            refined += positive;

            let passive = surrogate.nodes;
            surrogate.push(&state.indices, &state.surpluses);
            surrogate.step(level, nn, passive, positive);
            log::debug!("evaluated {nn} nodes at level {level}, {positive} to refine, {} in total", surrogate.nodes);

            progress.refined = refined;
            progress.integral.clone_from(&integral);
            if !target.after(&progress)
            {
                break;
            }
            next = strategy.next(state, &surrogate);
        }
        Ok(surrogate)
    }

    ///
    /// Evaluates `surrogate` at every point in `points`, `inputs` coordinates each.
    ///
    pub fn evaluate(&self, surrogate: &Surrogate, points: &[f64]) -> Vec<f64>
    {
        approximate(&self.basis, &surrogate.indices, &surrogate.surpluses, points, surrogate.inputs, surrogate.outputs)
    }

    ///
    /// Integrates `surrogate` over the unit cube.
    ///
    pub fn integrate(&self, surrogate: &Surrogate) -> Vec<f64>
    {
        let mut integral = vec![0.0; surrogate.outputs];
        for i in 0..surrogate.nodes
        {
            let volume = self.basis.integrate(surrogate.index(i));
            for (total, surplus) in integral.iter_mut().zip(surrogate.surplus(i))
            {
                *total += surplus * volume;
            }
        }
        integral
    }
}

#[cfg(test)]
fn branin(x: &[f64], y: &mut [f64])
{
    use std::f64::consts::PI;
    let (a, b) = (15.0 * x[0] - 5.0, 15.0 * x[1]);
    y[0] = (b - 5.1 / (4.0 * PI * PI) * a * a + 5.0 / PI * a - 6.0).powi(2) + 10.0 * (1.0 - 1.0 / (8.0 * PI)) * a.cos() + 10.0;
}

#[cfg(test)]
fn check_nodes<G: Grid, B: Basis>(interpolator: &Interpolator<G, B>, surrogate: &Surrogate, function: impl Fn(&[f64], &mut [f64]), tolerance: f64)
{
    let points = interpolator.grid().compute(&surrogate.indices);
    let values = interpolator.evaluate(surrogate, &points);
    let mut expected = vec![0.0; surrogate.outputs];
    for (point, value) in points.chunks_exact(surrogate.inputs).zip(values.chunks_exact(surrogate.outputs))
    {
        function(point, &mut expected);
        for (a, b) in value.iter().zip(&expected)
        {
            assert!((a - b).abs() < tolerance, "{a} != {b} at {point:?}");
        }
    }
}

#[test]
fn check_global_scenario()
{
    use crate::{algorithms::global::{GlobalConfig, GlobalStrategy}, basis::linear, grids::equidistant, target::BasicTarget};
    let function = |x: &[f64], y: &mut [f64]| y[0] = x[0].sin() + x[1].cos();
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);
    let mut strategy = GlobalStrategy::new(GlobalConfig::new(2, 1, 6, 1e-3, 1e-3), equidistant::Closed).unwrap();
    let mut target = BasicTarget::new(2, 1, function);
    let surrogate = interpolator.compute(&mut target, &mut strategy).unwrap();

    assert!(surrogate.nodes > 1);
    assert_eq!(surrogate.indices.len(), surrogate.nodes * 2);
    assert_eq!(surrogate.surpluses.len(), surrogate.nodes);
    assert_eq!(surrogate.active.iter().sum::<usize>(), surrogate.nodes);
    assert!(surrogate.level <= 7);

    let seed = interpolator.evaluate(&surrogate, &[0.5, 0.5]);
    assert!((seed[0] - (0.5_f64.sin() + 0.5_f64.cos())).abs() < 1e-12);
    check_nodes(&interpolator, &surrogate, function, 1e-10);
}

#[test]
fn check_open_builds()
{
    use crate::{algorithms::{global::{GlobalConfig, GlobalStrategy}, local::{LocalConfig, LocalStrategy}}, basis::linear, grids::equidistant, target::BasicTarget};
    let function = |x: &[f64], y: &mut [f64]| y[0] = (x[0] * x[1]).exp() + (3.0 * x[0]).sin();
    let interpolator = Interpolator::new(equidistant::Open, linear::Open);

    let mut strategy = GlobalStrategy::new(GlobalConfig::new(2, 1, 6, 1e-3, 1e-3), equidistant::Open).unwrap();
    let surrogate = interpolator.compute(&mut BasicTarget::new(2, 1, function), &mut strategy).unwrap();
    assert!(surrogate.nodes > 5);
    assert_eq!(surrogate.active.iter().sum::<usize>(), surrogate.nodes);
    check_nodes(&interpolator, &surrogate, function, 1e-10);

    let mut strategy = LocalStrategy::new(LocalConfig::new(2, 1, 6, 1e-3), equidistant::Open).unwrap();
    let surrogate = interpolator.compute(&mut BasicTarget::new(2, 1, function), &mut strategy).unwrap();
    assert!(surrogate.nodes > 5);
    check_nodes(&interpolator, &surrogate, function, 1e-10);
}

#[test]
fn check_multiple_outputs()
{
    use crate::{algorithms::{global::{GlobalConfig, GlobalStrategy}, local::{LocalConfig, LocalStrategy}}, basis::linear, grids::equidistant, target::BasicTarget};
    let function = |x: &[f64], y: &mut [f64]|
    {
        y[0] = x[0] + x[1] * x[2];
        y[1] = (x[0] - x[2]).cos() * x[1];
    };
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);

    let mut strategy = GlobalStrategy::new(GlobalConfig::new(3, 1, 5, 1e-3, 1e-3), equidistant::Closed).unwrap();
    let surrogate = interpolator.compute(&mut BasicTarget::new(3, 2, function), &mut strategy).unwrap();
    assert!(surrogate.nodes > 7);
    assert_eq!(surrogate.indices.len(), surrogate.nodes * 3);
    assert_eq!(surrogate.surpluses.len(), surrogate.nodes * 2);
    check_nodes(&interpolator, &surrogate, function, 1e-10);

    let mut strategy = LocalStrategy::new(LocalConfig::new(3, 1, 4, 1e-3), equidistant::Closed).unwrap();
    let surrogate = interpolator.compute(&mut BasicTarget::new(3, 2, function), &mut strategy).unwrap();
    assert!(surrogate.nodes > 7);
    check_nodes(&interpolator, &surrogate, function, 1e-10);
}

#[test]
fn check_polynomial_build()
{
    use crate::{algorithms::local::{LocalConfig, LocalStrategy}, basis::polynomial, grids::equidistant, target::BasicTarget};
    let function = |x: &[f64], y: &mut [f64]| y[0] = (4.0 * x[0]).sin();
    let interpolator = Interpolator::new(equidistant::Closed, polynomial::Closed::new(3).unwrap());
    let mut strategy = LocalStrategy::new(LocalConfig::new(1, 1, 6, 1e-4), equidistant::Closed).unwrap();
    let surrogate = interpolator.compute(&mut BasicTarget::new(1, 1, function), &mut strategy).unwrap();
    assert!(surrogate.nodes > 3);
    check_nodes(&interpolator, &surrogate, function, 1e-12);
    let value = interpolator.evaluate(&surrogate, &[0.3])[0];
    assert!((value - 1.2_f64.sin()).abs() < 1e-2);
}

#[test]
fn check_local_linear()
{
    use crate::{algorithms::local::{LocalConfig, LocalStrategy}, basis::linear, grids::equidistant, target::BasicTarget};
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);
    let mut strategy = LocalStrategy::new(LocalConfig::new(1, 1, 4, 1e-6), equidistant::Closed).unwrap();
    let mut target = BasicTarget::new(1, 1, |x, y| y[0] = x[0]);
    let surrogate = interpolator.compute(&mut target, &mut strategy).unwrap();
    assert_eq!(surrogate.nodes, 5);
    assert_eq!(surrogate.active, vec![1, 2, 2]);
    assert_eq!(surrogate.passive, vec![0, 1, 3]);
    assert_eq!(surrogate.refined, vec![1, 2, 0]);
    assert_eq!(surrogate.level, 2);
    let values = interpolator.evaluate(&surrogate, &[0.0, 0.3, 0.6, 1.0]);
    for (value, expected) in values.iter().zip([0.0, 0.3, 0.6, 1.0])
    {
        assert!((value - expected).abs() < 1e-12);
    }
}

#[test]
fn check_global_linear()
{
    use crate::{algorithms::global::{GlobalConfig, GlobalStrategy}, basis::linear, grids::equidistant, target::BasicTarget};
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);
    let mut strategy = GlobalStrategy::new(GlobalConfig::new(1, 1, 6, 1e-3, 1e-3), equidistant::Closed).unwrap();
    let mut target = BasicTarget::new(1, 1, |x, y| y[0] = x[0]);
    let surrogate = interpolator.compute(&mut target, &mut strategy).unwrap();
    assert_eq!(surrogate.nodes, 5);
    assert_eq!(surrogate.active, vec![1, 2, 2]);
}

#[test]
fn check_constant_integral()
{
    use crate::{algorithms::local::{LocalConfig, LocalStrategy}, basis::linear, grids::equidistant, target::BasicTarget};
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed).with_workers(2);
    let mut strategy = LocalStrategy::new(LocalConfig::new(2, 1, 5, 1e-6), equidistant::Closed).unwrap();
    let mut target = BasicTarget::new(2, 2, |_, y| { y[0] = 3.0; y[1] = -1.0; });
    let surrogate = interpolator.compute(&mut target, &mut strategy).unwrap();
    assert_eq!(surrogate.nodes, 5);
    assert_eq!(interpolator.integrate(&surrogate), vec![3.0, -1.0]);
}

#[test]
fn check_branin_progress()
{
    use std::sync::{Arc, Mutex};
    use crate::{algorithms::global::{GlobalConfig, GlobalStrategy}, basis::linear, grids::equidistant, target::BasicTarget};
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);
    let mut strategy = GlobalStrategy::new(GlobalConfig::new(2, 1, 5, 1e-2, 1e-2), equidistant::Closed).unwrap();
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = records.clone();
    let mut target = BasicTarget::new(2, 1, branin).on_after(move |progress| { sink.lock().unwrap().push(progress.clone()); true });
    let surrogate = interpolator.compute(&mut target, &mut strategy).unwrap();

    let records = records.lock().unwrap();
    assert_eq!(records.len(), surrogate.iterations());
    for (i, progress) in records.iter().enumerate()
    {
        assert_eq!(progress.active, surrogate.active[i]);
        assert_eq!(progress.passive, surrogate.active[..i].iter().sum::<usize>());
    }
    let last = records.last().unwrap();
    let integral = interpolator.integrate(&surrogate);
    assert!((last.integral[0] - integral[0]).abs() < 1e-9 * integral[0].abs().max(1.0));
    assert_eq!(last.refined, surrogate.refined.iter().sum::<usize>());
    check_nodes(&interpolator, &surrogate, branin, 1e-9);
}

#[test]
fn check_before_stops_build()
{
    use crate::{algorithms::local::{LocalConfig, LocalStrategy}, basis::linear, grids::equidistant, target::BasicTarget};
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);
    let mut strategy = LocalStrategy::new(LocalConfig::new(1, 1, 8, 1e-6), equidistant::Closed).unwrap();
    let mut target = BasicTarget::new(1, 1, |x, y| y[0] = x[0] * x[0]).on_before(|progress| progress.passive == 0);
    let surrogate = interpolator.compute(&mut target, &mut strategy).unwrap();
    assert_eq!(surrogate.nodes, 1);
    assert_eq!(surrogate.iterations(), 1);
}

#[test]
fn check_target_score_overrides()
{
    use crate::{algorithms::local::{LocalConfig, LocalStrategy}, basis::linear, grids::equidistant, target::BasicTarget};
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);
    let mut strategy = LocalStrategy::new(LocalConfig::new(1, 0, 8, 1e-6), equidistant::Closed).unwrap();
    // Nothing is ever refined, however far the function is from the surrogate.
    let mut target = BasicTarget::new(1, 1, |x, y| y[0] = x[0].exp()).on_score(|_| 0.0);
    let surrogate = interpolator.compute(&mut target, &mut strategy).unwrap();
    assert_eq!(surrogate.nodes, 1);
    assert_eq!(surrogate.refined, vec![0]);
}

#[test]
fn check_dimension_mismatch()
{
    use crate::{algorithms::local::{LocalConfig, LocalStrategy}, basis::linear, grids::equidistant, target::BasicTarget};
    let interpolator = Interpolator::new(equidistant::Closed, linear::Closed);
    let mut strategy = LocalStrategy::new(LocalConfig::new(1, 1, 4, 1e-3), equidistant::Closed).unwrap();
    let mut target = BasicTarget::new(2, 1, |x, y| y[0] = x[0] + x[1]);
    let result = interpolator.compute(&mut target, &mut strategy);
    assert_eq!(result, Err(AdaptError::DimensionMismatch { expected: 1, found: 2 }));
    let mut target = BasicTarget::new(1, 0, |_, _| {});
    assert!(matches!(interpolator.compute(&mut target, &mut strategy), Err(AdaptError::Config(_))));
}
