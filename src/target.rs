use serde::{Deserialize, Serialize};

///
/// What is known about a node once its value has been computed.
///
#[derive(Clone, Copy, Debug)]
pub struct Location<'a>
{
    pub index: &'a [u64],
    pub value: &'a [f64],
    pub surplus: &'a [f64],
    /// Integral of the node's basis function.
    pub volume: f64,
}

///
/// Snapshot of an ongoing build, handed to `Target::before` and `Target::after`.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress
{
    /// Highest total level reached so far.
    pub level: u64,
    /// Nodes evaluated in the current iteration.
    pub active: usize,
    /// Nodes accepted before the current iteration.
    pub passive: usize,
    /// Nodes with a positive score so far.
    pub refined: usize,
    /// Integral over the unit cube of the nodes accepted so far, per output.
    pub integral: Vec<f64>,
}

///
/// The function being approximated.
///
pub trait Target : Sync
{
    /// Number of inputs and number of outputs.
    fn dimensions(&self) -> (usize, usize);

    /// Called once per iteration before any evaluation. Returning `false` ends the build.
    fn before(&mut self, _progress: &Progress) -> bool
    {
        true
    }

    /// Evaluates the function at `point`, writing one value per output.
    /// Calls within an iteration may run concurrently.
    fn compute(&self, point: &[f64], value: &mut [f64]);

    /// Overrides the strategy's score of a node. `None` keeps the strategy's score.
    fn score(&self, _location: &Location<'_>) -> Option<f64>
    {
        None
    }

    /// Called once per iteration after the iteration's nodes have been accepted.
    /// Returning `false` ends the build.
    fn after(&mut self, _progress: &Progress) -> bool
    {
        true
    }
}

pub type ComputeHandler = dyn Fn(&[f64], &mut [f64]) + Send + Sync;
pub type ScoreHandler = dyn Fn(&Location<'_>) -> f64 + Send + Sync;
pub type ProgressHandler = dyn FnMut(&Progress) -> bool + Send + Sync;

///
/// A target assembled from closures. Every hook other than `compute` is optional.
///
pub struct BasicTarget
{
    pub inputs: usize,
    pub outputs: usize,
    /// When set and no score handler is given, a node scores `1.0` if any
    /// surplus exceeds the tolerance in magnitude and `0.0` otherwise.
    pub tolerance: Option<f64>,
    pub compute_handler: Box<ComputeHandler>,
    pub score_handler: Option<Box<ScoreHandler>>,
    pub before_handler: Option<Box<ProgressHandler>>,
    pub after_handler: Option<Box<ProgressHandler>>,
}

impl BasicTarget
{
    pub fn new<F>(inputs: usize, outputs: usize, compute: F) -> Self
    where F: Fn(&[f64], &mut [f64]) + Send + Sync + 'static
    {
        Self
        {
            inputs,
            outputs,
            tolerance: None,
            compute_handler: Box::new(compute),
            score_handler: None,
            before_handler: None,
            after_handler: None,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self
    {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn on_score<F>(mut self, handler: F) -> Self
    where F: Fn(&Location<'_>) -> f64 + Send + Sync + 'static
    {
        self.score_handler = Some(Box::new(handler));
        self
    }

    pub fn on_before<F>(mut self, handler: F) -> Self
    where F: FnMut(&Progress) -> bool + Send + Sync + 'static
    {
        self.before_handler = Some(Box::new(handler));
        self
    }

    pub fn on_after<F>(mut self, handler: F) -> Self
    where F: FnMut(&Progress) -> bool + Send + Sync + 'static
    {
        self.after_handler = Some(Box::new(handler));
        self
    }

    fn default_score(tolerance: f64, location: &Location<'_>) -> f64
    {
        if location.surplus.iter().any(|surplus| surplus.abs() > tolerance)
        {
            1.0
        }
        else
        {
            0.0
        }
    }
}

impl std::fmt::Debug for BasicTarget
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("BasicTarget")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl Target for BasicTarget
{
    fn dimensions(&self) -> (usize, usize)
    {
        (self.inputs, self.outputs)
    }

    fn before(&mut self, progress: &Progress) -> bool
    {
        match self.before_handler.as_mut()
        {
            Some(handler) => handler(progress),
            None => true,
        }
    }

    fn compute(&self, point: &[f64], value: &mut [f64])
    {
        (self.compute_handler)(point, value)
    }

    fn score(&self, location: &Location<'_>) -> Option<f64>
    {
        if let Some(handler) = self.score_handler.as_ref()
        {
            Some(handler(location))
        }
        else
        {
            self.tolerance.map(|tolerance| Self::default_score(tolerance, location))
        }
    }

    fn after(&mut self, progress: &Progress) -> bool
    {
        match self.after_handler.as_mut()
        {
            Some(handler) => handler(progress),
            None => true,
        }
    }
}

#[test]
fn check_basic_target_hooks()
{
    let mut target = BasicTarget::new(2, 1, |x, y| y[0] = x[0] + x[1]);
    assert_eq!(target.dimensions(), (2, 1));
    let mut value = [0.0];
    target.compute(&[0.25, 0.5], &mut value);
    assert_eq!(value, [0.75]);

    let location = Location { index: &[0, 0], value: &[1.0], surplus: &[-0.3], volume: 1.0 };
    assert_eq!(target.score(&location), None);
    assert!(target.before(&Progress::default()));

    let mut target = target.with_tolerance(0.1).on_after(|progress| progress.active < 10);
    assert_eq!(target.score(&location), Some(1.0));
    let quiet = Location { surplus: &[0.05], ..location };
    assert_eq!(target.score(&quiet), Some(0.0));
    assert!(!target.after(&Progress { active: 10, ..Default::default() }));

    let target = target.on_score(|location| location.volume * 2.0);
    assert_eq!(target.score(&location), Some(2.0));
}
