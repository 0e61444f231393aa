use serde::{Deserialize, Serialize};

///
/// Refinement priority of a node or of a level index. Level bounds override
/// the computed score: below the minimum level everything is refined, at or
/// above the maximum level nothing is.
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Priority
{
    ForceRefine,
    ForceStop,
    Computed(f64),
}

impl Priority
{
    pub fn gate(level: u64, min_level: u32, max_level: u32, score: f64) -> Self
    {
        if level < min_level as u64
        {
            Priority::ForceRefine
        }
        else if level >= max_level as u64
        {
            Priority::ForceStop
        }
        else
        {
            Priority::Computed(score)
        }
    }

    /// Finite value of the priority; `None` when refinement is forced.
    #[inline]
    pub fn value(&self) -> Option<f64>
    {
        match *self
        {
            Priority::ForceRefine => None,
            Priority::ForceStop => Some(0.0),
            Priority::Computed(score) => Some(score),
        }
    }

    #[inline]
    pub fn is_positive(&self) -> bool
    {
        match *self
        {
            Priority::ForceRefine => true,
            Priority::ForceStop => false,
            Priority::Computed(score) => score > 0.0,
        }
    }

    ///
    /// Whether the priority is at least `threshold`.
    ///
    #[inline]
    pub fn reaches(&self, threshold: f64) -> bool
    {
        match self.value()
        {
            None => true,
            Some(value) => value >= threshold,
        }
    }

    ///
    /// Strict ordering used when picking the index to expand next. NaN never
    /// exceeds anything.
    ///
    pub fn exceeds(&self, other: &Priority) -> bool
    {
        match (self.value(), other.value())
        {
            (None, None) => false,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a > b,
        }
    }
}

#[test]
fn check_gate()
{
    assert_eq!(Priority::gate(0, 1, 4, 0.0), Priority::ForceRefine);
    assert_eq!(Priority::gate(1, 1, 4, 0.5), Priority::Computed(0.5));
    assert_eq!(Priority::gate(4, 1, 4, 9.0), Priority::ForceStop);
    assert_eq!(Priority::gate(7, 1, 4, 9.0), Priority::ForceStop);
}

#[test]
fn check_ordering()
{
    let refine = Priority::ForceRefine;
    let stop = Priority::ForceStop;
    let small = Priority::Computed(0.1);
    let nan = Priority::Computed(f64::NAN);
    assert!(refine.exceeds(&small) && refine.exceeds(&stop));
    assert!(!refine.exceeds(&refine));
    assert!(small.exceeds(&stop) && !stop.exceeds(&small));
    assert!(!nan.exceeds(&stop) && !small.exceeds(&nan));
    assert!(refine.is_positive() && !stop.is_positive() && !nan.is_positive());
    assert!(refine.reaches(1e300) && !stop.reaches(1e-3) && small.reaches(0.1));
}
