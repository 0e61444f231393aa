use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{errors::{AdaptError, AdaptResult}, grids::base::Grid, index::levelize, surrogate::Surrogate, target::Location, utilities::hash::{Hash, Unique}};

use super::{active::Active, priority::Priority, strategy::{State, Strategy}, support::max_absolute};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig
{
    pub inputs: usize,
    /// Level indices below this total level are always expanded.
    pub min_level: u32,
    /// Level indices at or above this total level are never expanded.
    pub max_level: u32,
    /// Nodes scoring below this value do not spawn children.
    pub local_error: f64,
    /// The build stops once the active level indices score at most this much in total.
    pub total_error: f64,
}

impl Default for GlobalConfig
{
    fn default() -> Self
    {
        Self { inputs: 1, min_level: 1, max_level: 10, local_error: 1e-3, total_error: 1e-3 }
    }
}

impl GlobalConfig
{
    pub fn new(inputs: usize, min_level: u32, max_level: u32, local_error: f64, total_error: f64) -> Self
    {
        Self { inputs, min_level, max_level, local_error, total_error }
    }

    pub fn validate(&self) -> AdaptResult<()>
    {
        if self.inputs == 0
        {
            return Err(AdaptError::Config("inputs must be positive".to_owned()));
        }
        if self.min_level > self.max_level
        {
            return Err(AdaptError::Config(format!("min_level {} exceeds max_level {}", self.min_level, self.max_level)));
        }
        for (name, value) in [("local_error", self.local_error), ("total_error", self.total_error)]
        {
            if !value.is_finite() || value <= 0.0
            {
                return Err(AdaptError::Config(format!("{name} must be finite and positive, got {value}")));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> AdaptResult<Self>
    {
        let config: Self = serde_json::from_str(json).map_err(|e| AdaptError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

///
/// Dimension-adaptive strategy over level indices with local pruning inside
/// each increment.
///
/// Level indices are expanded one at a time, always the active one with the
/// largest global priority. The nodes of a new level index are the children,
/// along the expanded dimension, of the nodes of its backward neighbours whose
/// local priority reaches the local tolerance.
///
/// Every side table is indexed by position and only grows, so an instance
/// serves exactly one build.
///
#[derive(Clone, Debug)]
pub struct GlobalStrategy<G: Grid>
{
    active: Active,
    config: GlobalConfig,
    grid: G,
    /// Level index expanded by the latest `next`.
    k: Option<usize>,
    hash: Hash,
    unique: Unique,
    position: FxHashMap<Vec<u8>, usize>,
    /// Position of the first node of each level index.
    offset: Vec<usize>,
    global: Vec<Priority>,
    local: Vec<Priority>,
}

impl<G: Grid> GlobalStrategy<G>
{
    pub fn new(config: GlobalConfig, grid: G) -> AdaptResult<Self>
    {
        config.validate()?;
        let ni = config.inputs;
        Ok(Self
        {
            active: Active::new(ni),
            config,
            grid,
            k: None,
            hash: Hash::new(ni),
            unique: Unique::new(ni),
            position: FxHashMap::default(),
            offset: Vec::new(),
            global: Vec::new(),
            local: Vec::new(),
        })
    }

    pub fn config(&self) -> &GlobalConfig
    {
        &self.config
    }

    ///
    /// Sum of the global priorities of the active level indices that have been
    /// scored. `None` when one of them is forced, which makes the sum unbounded.
    ///
    pub fn total_error(&self) -> Option<f64>
    {
        let scored = self.global.len();
        let mut total = 0.0;
        for k in self.active.positions().filter(|&k| k < scored)
        {
            total += self.global[k].value()?;
        }
        Some(total)
    }

    pub fn active_count(&self) -> usize
    {
        self.active.num_active()
    }

    fn consume(&mut self, state: &State)
    {
        let ni = self.config.inputs;
        let ng = self.global.len();
        let levels = levelize(&state.lindices, ni);
        let mut o = 0;
        for (i, &count) in state.counts.iter().enumerate()
        {
            let lindex = &state.lindices[i * ni..(i + 1) * ni];
            let scores = &state.scores[o..o + count];
            let sum: f64 = scores.iter().sum();
            self.offset.push(self.local.len());
            self.global.push(Priority::gate(levels[i], self.config.min_level, self.config.max_level, sum));
            self.local.extend(scores.iter().map(|&score|
                Priority::gate(levels[i], self.config.min_level, self.config.max_level, score)));
            self.position.insert(self.hash.key(lindex), ng + i);
            o += count;
        }
    }

    ///
    /// Active position with the largest global priority, the earliest admitted on ties.
    ///
    fn locate_max(&self) -> Option<usize>
    {
        let mut best: Option<usize> = None;
        for k in self.active.positions()
        {
            match best
            {
                Some(b) if !self.global[k].exceeds(&self.global[b]) => {},
                _ => best = Some(k),
            }
        }
        best
    }

    fn index(&mut self, lindices: &mut [u64], surrogate: &Surrogate) -> (Vec<u64>, Vec<usize>)
    {
        let ni = self.config.inputs;
        let mut indices = Vec::new();
        let mut counts = Vec::with_capacity(lindices.len() / ni);
        for lindex in lindices.chunks_exact_mut(ni)
        {
            let before = indices.len();
            for j in 0..ni
            {
                let level = lindex[j];
                if level == 0
                {
                    continue;
                }
                lindex[j] = level - 1;
                let parent = self.position.get(&self.hash.key(lindex)).copied();
                lindex[j] = level;
                let Some(k) = parent else { continue };

                let from = self.offset[k];
                let till = self.offset.get(k + 1).copied().unwrap_or(self.local.len());
                for p in from..till
                {
                    if !self.local[p].reaches(self.config.local_error)
                    {
                        continue;
                    }
                    let children = self.grid.refine_toward(surrogate.index(p), j);
                    indices.extend(self.unique.distil(children));
                }
            }
            counts.push((indices.len() - before) / ni);
        }
        (indices, counts)
    }
}

impl<G: Grid> Strategy for GlobalStrategy<G>
{
    fn num_inputs(&self) -> usize
    {
        self.config.inputs
    }

    fn first(&mut self) -> State
    {
        let ni = self.config.inputs;
        self.k = None;
        self.unique = Unique::new(ni);
        self.position.clear();
        self.offset.clear();
        self.global.clear();
        self.local.clear();

        let lindices = self.active.first();
        let indices = self.unique.distil(self.grid.index(&lindices, ni));
        let counts = vec![indices.len() / ni];
        State { lindices, indices, counts, ..Default::default() }
    }

    fn check(&self, _state: &State, _surrogate: &Surrogate) -> bool
    {
        if self.k.is_none()
        {
            return true;
        }
        match self.total_error()
        {
            None => true,
            Some(total) => total > self.config.total_error,
        }
    }

    fn score(&self, location: &Location<'_>) -> f64
    {
        max_absolute(location.surplus) * location.volume
    }

    fn next(&mut self, state: State, surrogate: &Surrogate) -> Option<State>
    {
        self.consume(&state);
        if let Some(k) = self.k
        {
            self.active.drop(k);
        }
        let k = self.locate_max()?;
        self.k = Some(k);
        if !self.global[k].is_positive()
        {
            log::trace!("largest active priority {:?} is not positive", self.global[k]);
            return None;
        }

        let mut lindices = self.active.next(k);
        let (indices, counts) = self.index(&mut lindices, surrogate);
        log::trace!("expanded {:?} into {} level indices and {} nodes", self.active.index(k), counts.len(),
            indices.len() / self.config.inputs);
        Some(State { lindices, indices, counts, ..Default::default() })
    }
}

#[cfg(test)]
fn fabricate_scores(state: &mut State, ni: usize)
{
    let levels = levelize(&state.lindices, ni);
    state.scores = state.counts.iter().zip(&levels)
        .flat_map(|(&count, &level)| std::iter::repeat(10f64.powi(-(level as i32)) / count as f64).take(count))
        .collect();
}

#[test]
fn check_global_first()
{
    use crate::{grids::equidistant::Closed, index::compose};
    let mut strategy = GlobalStrategy::new(GlobalConfig::new(2, 1, 4, 1e-3, 1e-3), Closed).unwrap();
    let state = strategy.first();
    assert_eq!(state.lindices, vec![0, 0]);
    assert_eq!(state.indices, vec![compose(0, 0), compose(0, 0)]);
    assert_eq!(state.counts, vec![1]);
    assert!(strategy.check(&state, &Surrogate::new(2, 1)));
}

#[test]
fn check_global_expansion()
{
    use crate::{grids::equidistant::Closed, index::compose};
    let ni = 2;
    let mut strategy = GlobalStrategy::new(GlobalConfig::new(ni, 1, 4, 1e-3, 1e-3), Closed).unwrap();
    let mut surrogate = Surrogate::new(ni, 1);
    let mut state = strategy.first();
    state.scores = vec![0.0];
    surrogate.push(&state.indices, &state.scores);

    // The root is below the minimum level and is expanded regardless of its score.
    let mut state = strategy.next(state, &surrogate).unwrap();
    assert_eq!(state.lindices, vec![1, 0, 0, 1]);
    assert_eq!(state.counts, vec![2, 2]);
    assert_eq!(state.indices, vec![
        compose(1, 0), compose(0, 0),
        compose(1, 2), compose(0, 0),
        compose(0, 0), compose(1, 0),
        compose(0, 0), compose(1, 2),
    ]);
    assert_eq!(strategy.total_error(), None);

    // Only the right node along the second dimension matters.
    state.scores = vec![0.0, 0.0, 0.0, 0.5];
    surrogate.push(&state.indices, &state.scores);
    assert!(strategy.check(&state, &surrogate));
    let mut state = strategy.next(state, &surrogate).unwrap();
    // [1, 1] waits for [1, 0] to become passive.
    assert_eq!(state.lindices, vec![0, 2]);
    assert_eq!(state.counts, vec![1]);
    assert_eq!(state.indices, vec![compose(0, 0), compose(2, 3)]);
    assert_eq!(strategy.total_error(), Some(0.5));
    assert_eq!(strategy.active_count(), 3);

    // Every remaining active index scores zero.
    state.scores = vec![0.0];
    surrogate.push(&state.indices, &state.scores);
    assert!(strategy.next(state, &surrogate).is_none());
    assert_eq!(strategy.total_error(), Some(0.0));
}

#[test]
fn check_global_stops_without_priority()
{
    use crate::grids::equidistant::Closed;
    let mut strategy = GlobalStrategy::new(GlobalConfig::new(1, 0, 4, 1e-3, 1e-3), Closed).unwrap();
    let mut surrogate = Surrogate::new(1, 1);
    let mut state = strategy.first();
    state.scores = vec![0.0];
    surrogate.push(&state.indices, &state.scores);
    assert!(strategy.next(state, &surrogate).is_none());
}

#[test]
fn check_global_stops_on_nan()
{
    use crate::grids::equidistant::Closed;
    let mut strategy = GlobalStrategy::new(GlobalConfig::new(2, 0, 4, 1e-3, 1e-3), Closed).unwrap();
    let mut surrogate = Surrogate::new(2, 1);
    let mut state = strategy.first();
    state.scores = vec![f64::NAN];
    surrogate.push(&state.indices, &state.scores);
    assert!(strategy.next(state, &surrogate).is_none());
    assert_eq!(strategy.active_count(), 1);
}

#[test]
fn check_monotone_total_error()
{
    use crate::grids::equidistant::Closed;
    let ni = 2;
    let mut strategy = GlobalStrategy::new(GlobalConfig::new(ni, 0, 6, 1e-12, 1e-12), Closed).unwrap();
    let mut surrogate = Surrogate::new(ni, 1);
    let mut state = strategy.first();
    let mut previous = f64::INFINITY;
    for _ in 0..200
    {
        fabricate_scores(&mut state, ni);
        surrogate.push(&state.indices, &state.scores);
        match strategy.next(state, &surrogate)
        {
            Some(next) => state = next,
            None => break,
        }
        let total = strategy.total_error().unwrap();
        assert!(total <= previous * (1.0 + 1e-12), "total error grew from {previous} to {total}");
        previous = total;
    }
    assert!(previous < 1.0);
}

#[test]
fn check_global_config()
{
    use crate::grids::equidistant::Closed;
    assert!(GlobalStrategy::new(GlobalConfig::new(2, 1, 4, 1e-3, 0.0), Closed).is_err());
    assert!(GlobalStrategy::new(GlobalConfig::new(2, 1, 4, -1.0, 1e-3), Closed).is_err());
    assert!(GlobalConfig::new(2, 3, 2, 1e-3, 1e-3).validate().is_err());
    let config = GlobalConfig::from_json(r#"{ "inputs": 2, "min_level": 2, "total_error": 1e-6 }"#).unwrap();
    assert_eq!(config, GlobalConfig { inputs: 2, min_level: 2, total_error: 1e-6, ..Default::default() });
}
