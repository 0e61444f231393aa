use serde::{Deserialize, Serialize};

///
/// The result of a build: every accepted multi-index with its hierarchical
/// surpluses, plus per-iteration counters.
///
/// `indices` holds `nodes * inputs` codewords and `surpluses` holds
/// `nodes * outputs` values, both in acceptance order.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Surrogate
{
    pub inputs: usize,
    pub outputs: usize,
    /// Highest total level among the accepted nodes.
    pub level: u64,
    pub nodes: usize,
    pub active: Vec<usize>,
    pub passive: Vec<usize>,
    pub refined: Vec<usize>,
    pub indices: Vec<u64>,
    pub surpluses: Vec<f64>,
}

impl Surrogate
{
    pub fn new(inputs: usize, outputs: usize) -> Self
    {
        Self { inputs, outputs, ..Default::default() }
    }

    ///
    /// Appends a batch of multi-indices with their surpluses.
    ///
    pub fn push(&mut self, indices: &[u64], surpluses: &[f64])
    {
        debug_assert_eq!(indices.len() / self.inputs, surpluses.len() / self.outputs);
        self.indices.extend_from_slice(indices);
        self.surpluses.extend_from_slice(surpluses);
        self.nodes += indices.len() / self.inputs;
    }

    ///
    /// Records the counters of one iteration.
    ///
    pub fn step(&mut self, level: u64, active: usize, passive: usize, refined: usize)
    {
        self.level = level;
        self.active.push(active);
        self.passive.push(passive);
        self.refined.push(refined);
    }

    #[inline]
    pub fn index(&self, i: usize) -> &[u64]
    {
        &self.indices[i * self.inputs..(i + 1) * self.inputs]
    }

    #[inline]
    pub fn surplus(&self, i: usize) -> &[f64]
    {
        &self.surpluses[i * self.outputs..(i + 1) * self.outputs]
    }

    /// Number of completed iterations.
    pub fn iterations(&self) -> usize
    {
        self.active.len()
    }
}

impl std::fmt::Display for Surrogate
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "Surrogate{{inputs: {}, outputs: {}, level: {}, nodes: {}}}",
            self.inputs, self.outputs, self.level, self.nodes)
    }
}

#[test]
fn check_push_and_step()
{
    let mut surrogate = Surrogate::new(2, 1);
    surrogate.push(&[0, 0], &[1.5]);
    surrogate.step(0, 1, 0, 1);
    surrogate.push(&[1, 0, 1 | (2 << 32), 0], &[0.25, -0.25]);
    surrogate.step(1, 2, 1, 0);
    assert_eq!(surrogate.nodes, 3);
    assert_eq!(surrogate.index(2), &[1 | (2 << 32), 0]);
    assert_eq!(surrogate.surplus(1), &[0.25]);
    assert_eq!(surrogate.active, vec![1, 2]);
    assert_eq!(surrogate.passive, vec![0, 1]);
    assert_eq!(surrogate.refined, vec![1, 0]);
    assert_eq!(surrogate.iterations(), 2);
    assert_eq!(surrogate.to_string(), "Surrogate{inputs: 2, outputs: 1, level: 1, nodes: 3}");
}

#[test]
fn check_serialization()
{
    let mut surrogate = Surrogate::new(1, 2);
    surrogate.push(&[0], &[1.0, 2.0]);
    surrogate.step(0, 1, 0, 1);
    let json = serde_json::to_string(&surrogate).unwrap();
    let restored: Surrogate = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, surrogate);
}
