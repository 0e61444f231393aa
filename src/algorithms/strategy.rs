use crate::{surrogate::Surrogate, target::Location};

///
/// One iteration's worth of nodes. A strategy fills `indices` (and, for
/// strategies working with level indices, `lindices` and `counts`); the
/// interpolator fills the rest before handing the state back.
///
#[derive(Clone, Debug, Default)]
pub struct State
{
    /// Level indices the batch was generated from, `ni` words each.
    pub lindices: Vec<u64>,
    /// Multi-indices of the batch, `ni` codewords each.
    pub indices: Vec<u64>,
    /// Number of nodes contributed by each level index.
    pub counts: Vec<usize>,
    pub volumes: Vec<f64>,
    pub nodes: Vec<f64>,
    pub values: Vec<f64>,
    pub surpluses: Vec<f64>,
    pub scores: Vec<f64>,
}

impl State
{
    pub fn with_indices(indices: Vec<u64>) -> Self
    {
        Self { indices, ..Default::default() }
    }

    pub fn len(&self, ni: usize) -> usize
    {
        self.indices.len() / ni
    }
}

///
/// Decides which nodes are evaluated and when the build stops.
///
/// A strategy instance carries the bookkeeping of exactly one build; create a
/// fresh one for every call to `Interpolator::compute`.
///
pub trait Strategy
{
    fn num_inputs(&self) -> usize;

    /// Initial batch of the build.
    fn first(&mut self) -> State;

    /// Whether the build should carry on with `state`.
    fn check(&self, _state: &State, _surrogate: &Surrogate) -> bool
    {
        true
    }

    /// Score of a freshly evaluated node.
    fn score(&self, location: &Location<'_>) -> f64;

    /// Consumes the evaluated batch and produces the next one, or `None` when
    /// there is nothing left to refine.
    fn next(&mut self, state: State, surrogate: &Surrogate) -> Option<State>;
}
