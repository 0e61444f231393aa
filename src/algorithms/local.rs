use serde::{Deserialize, Serialize};

use crate::{errors::{AdaptError, AdaptResult}, grids::base::Grid, index::level_sum, surrogate::Surrogate, target::Location, utilities::hash::Unique};

use super::{strategy::{State, Strategy}, support::max_absolute};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig
{
    pub inputs: usize,
    /// Nodes below this total level are always refined.
    pub min_level: u32,
    /// Nodes at or above this total level are never refined.
    pub max_level: u32,
    /// Nodes scoring at or below this value are not refined.
    pub local_error: f64,
}

impl Default for LocalConfig
{
    fn default() -> Self
    {
        Self { inputs: 1, min_level: 1, max_level: 10, local_error: 1e-3 }
    }
}

impl LocalConfig
{
    pub fn new(inputs: usize, min_level: u32, max_level: u32, local_error: f64) -> Self
    {
        Self { inputs, min_level, max_level, local_error }
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
        if !self.local_error.is_finite() || self.local_error <= 0.0
        {
            return Err(AdaptError::Config(format!("local_error must be finite and positive, got {}", self.local_error)));
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
/// Refines every node whose score exceeds the local tolerance, one level at a
/// time, without any notion of level indices.
///
#[derive(Clone, Debug)]
pub struct LocalStrategy<G: Grid>
{
    config: LocalConfig,
    grid: G,
    unique: Unique,
}

impl<G: Grid> LocalStrategy<G>
{
    pub fn new(config: LocalConfig, grid: G) -> AdaptResult<Self>
    {
        config.validate()?;
        let unique = Unique::new(config.inputs);
        Ok(Self { config, grid, unique })
    }

    pub fn config(&self) -> &LocalConfig
    {
        &self.config
    }
}

impl<G: Grid> Strategy for LocalStrategy<G>
{
    fn num_inputs(&self) -> usize
    {
        self.config.inputs
    }

    fn first(&mut self) -> State
    {
        self.unique = Unique::new(self.config.inputs);
        State::with_indices(self.unique.distil(vec![0; self.config.inputs]))
    }

    fn score(&self, location: &Location<'_>) -> f64
    {
        max_absolute(location.surplus)
    }

    fn next(&mut self, state: State, _surrogate: &Surrogate) -> Option<State>
    {
        let ni = self.config.inputs;
        let indices = filter(state.indices, &state.scores, self.config.min_level, self.config.max_level,
            self.config.local_error, ni);
        let indices = self.unique.distil(self.grid.refine(&indices, ni));
        log::trace!("local strategy produced {} candidates", indices.len() / ni);
        if indices.is_empty()
        {
            None
        }
        else
        {
            Some(State::with_indices(indices))
        }
    }
}

///
/// Drops the nodes that should not be refined further. A node is removed when
/// its total level is at least `min_level` and either its score is at most
/// `local_error` or its level has reached `max_level`. Survivors keep their order.
/// Nodes without a score are dropped.
///
pub fn filter(mut indices: Vec<u64>, scores: &[f64], min_level: u32, max_level: u32, local_error: f64, ni: usize) -> Vec<u64>
{
    let nn = scores.len().min(indices.len() / ni);
    let mut kept = 0;
    for i in 0..nn
    {
        let level = level_sum(&indices[i * ni..(i + 1) * ni]);
        let removed = level >= min_level as u64 && (scores[i] <= local_error || level >= max_level as u64);
        if removed
        {
            continue;
        }
        if i > kept
        {
            indices.copy_within(i * ni..(i + 1) * ni, kept * ni);
        }
        kept += 1;
    }
    indices.truncate(kept * ni);
    indices
}

#[test]
fn check_filter()
{
    use crate::index::compose;
    let indices = vec![compose(0, 0), compose(1, 2), compose(2, 1), compose(3, 5)];
    let filtered = filter(indices, &[1.0, 1.0, 0.0, 1.0], 1, 3, 0.5, 1);
    assert_eq!(filtered, vec![compose(0, 0), compose(1, 2)]);
}

#[test]
fn check_filter_keeps_order()
{
    use crate::index::compose;
    let indices = vec![
        compose(1, 0), compose(0, 0),
        compose(1, 2), compose(0, 0),
        compose(0, 0), compose(1, 0),
        compose(0, 0), compose(1, 2),
    ];
    let filtered = filter(indices, &[0.1, 2.0, 0.0, 3.0], 0, 5, 0.5, 2);
    assert_eq!(filtered, vec![compose(1, 2), compose(0, 0), compose(0, 0), compose(1, 2)]);
    // Nodes below the minimum level survive even with a zero score.
    let filtered = filter(vec![compose(1, 0)], &[0.0], 2, 5, 0.5, 1);
    assert_eq!(filtered, vec![compose(1, 0)]);
}

#[test]
fn check_filter_unscored()
{
    use crate::index::compose;
    let indices = vec![compose(0, 0), compose(1, 0), compose(1, 2)];
    assert_eq!(filter(indices, &[1.0, 1.0], 0, 5, 0.5, 1), vec![compose(0, 0), compose(1, 0)]);
    assert!(filter(vec![compose(0, 0)], &[], 1, 5, 0.5, 1).is_empty());
}

#[test]
fn check_local_next()
{
    use crate::{grids::equidistant::Closed, index::compose};
    let mut strategy = LocalStrategy::new(LocalConfig::new(1, 1, 4, 1e-6), Closed).unwrap();
    let mut state = strategy.first();
    assert_eq!(state.indices, vec![0]);
    state.scores = vec![0.0];
    let surrogate = Surrogate::new(1, 1);
    let mut state = strategy.next(state, &surrogate).unwrap();
    assert_eq!(state.indices, vec![compose(1, 0), compose(1, 2)]);
    state.scores = vec![0.0, 1.0];
    let mut state = strategy.next(state, &surrogate).unwrap();
    assert_eq!(state.indices, vec![compose(2, 3)]);
    state.scores = vec![0.0];
    assert!(strategy.next(state, &surrogate).is_none());
}

#[test]
fn check_local_config()
{
    assert!(LocalStrategy::new(LocalConfig::new(0, 1, 4, 1e-3), crate::grids::equidistant::Closed).is_err());
    assert!(LocalConfig::new(2, 5, 4, 1e-3).validate().is_err());
    assert!(LocalConfig::new(2, 1, 4, 0.0).validate().is_err());
    assert!(LocalConfig::new(2, 1, 4, f64::NAN).validate().is_err());
    let config = LocalConfig::from_json(r#"{ "inputs": 3, "max_level": 7 }"#).unwrap();
    assert_eq!(config, LocalConfig { inputs: 3, max_level: 7, ..Default::default() });
    assert!(matches!(LocalConfig::from_json("{ \"inputs\": \"two\" }"), Err(AdaptError::Config(_))));
}
