use serde::{Deserialize, Serialize};

use super::base::Basis;

#[inline]
fn scale(level: u32) -> f64
{
    2.0_f64.powi(level as i32)
}

///
/// Piecewise-linear hat functions on the closed grid of `[0, 1]`. Level zero is
/// the constant function, level one holds the two boundary hats.
///
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Closed;

impl Basis for Closed
{
    #[inline]
    fn eval(&self, level: u32, order: u32, x: f64) -> f64
    {
        if level == 0
        {
            return 1.0;
        }
        let scale = scale(level);
        let distance = (x - order as f64 / scale).abs();
        if scale * distance < 1.0
        {
            1.0 - scale * distance
        }
        else
        {
            0.0
        }
    }

    #[inline]
    fn integral(&self, level: u32, _order: u32) -> f64
    {
        match level
        {
            0 => 1.0,
            1 => 0.25,
            _ => 1.0 / scale(level),
        }
    }
}

///
/// Piecewise-linear hat functions on the open grid of `[0, 1]`. The outermost
/// function on each level extrapolates linearly towards the boundary.
///
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Open;

impl Open
{
    #[inline]
    fn is_left(order: u32) -> bool
    {
        order == 0
    }

    #[inline]
    fn is_right(level: u32, order: u32) -> bool
    {
        order as u64 == (2_u64 << level) - 2
    }
}

impl Basis for Open
{
    fn eval(&self, level: u32, order: u32, x: f64) -> f64
    {
        if !(0.0..=1.0).contains(&x)
        {
            return 0.0;
        }
        if level == 0
        {
            return 1.0;
        }
        let scale = scale(level + 1);
        if Self::is_left(order) && scale * x < 2.0
        {
            return 2.0 - scale * x;
        }
        if Self::is_right(level, order) && scale * (1.0 - x) < 2.0
        {
            return 2.0 - scale * (1.0 - x);
        }
        if Self::is_left(order) || Self::is_right(level, order)
        {
            return 0.0;
        }
        let distance = (x - (order as f64 + 1.0) / scale).abs();
        if scale * distance < 1.0
        {
            1.0 - scale * distance
        }
        else
        {
            0.0
        }
    }

    fn integral(&self, level: u32, order: u32) -> f64
    {
        if level == 0
        {
            1.0
        }
        else if Self::is_left(order) || Self::is_right(level, order)
        {
            1.0 / scale(level)
        }
        else
        {
            1.0 / scale(level + 1)
        }
    }
}

#[cfg(test)]
fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64)
{
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected)
    {
        assert!((a - e).abs() < tolerance, "{actual:?} != {expected:?}");
    }
}

#[test]
fn check_closed_eval()
{
    let basis = Closed;
    let points = [0.0, 0.25, 0.5, 0.75, 1.0];
    let cases: [(u32, u32, [f64; 5]); 5] = [
        (0, 0, [1.0, 1.0, 1.0, 1.0, 1.0]),
        (1, 0, [1.0, 0.5, 0.0, 0.0, 0.0]),
        (1, 2, [0.0, 0.0, 0.0, 0.5, 1.0]),
        (2, 1, [0.0, 1.0, 0.0, 0.0, 0.0]),
        (2, 3, [0.0, 0.0, 0.0, 1.0, 0.0]),
    ];
    for (level, order, expected) in cases
    {
        let values: Vec<f64> = points.iter().map(|&x| basis.eval(level, order, x)).collect();
        assert_eq!(values, expected);
    }
}

#[test]
fn check_closed_integral()
{
    use crate::index::compose;
    let basis = Closed;
    let expected = [1.0, 0.25, 0.25, 0.125];
    for (level, &value) in expected.iter().enumerate()
    {
        assert_eq!(basis.integrate(&[compose(level as u32, 0)]), value);
    }
    assert_eq!(basis.integrate(&[compose(1, 0), compose(2, 3)]), 0.0625);
}

#[test]
fn check_closed_hat_sum()
{
    // Level-three hats of a closed grid form a sawtooth peaking at the level-three nodes.
    let basis = Closed;
    let orders = [1, 3, 5, 7];
    let points: Vec<f64> = (0..=16).map(|i| i as f64 / 16.0).collect();
    let values: Vec<f64> = points.iter().map(|&x| orders.iter().map(|&o| basis.eval(3, o, x)).sum()).collect();
    for (i, value) in values.iter().enumerate()
    {
        let expected = match i % 4
        {
            0 => 0.0,
            2 => 1.0,
            _ => 0.5,
        };
        assert!((value - expected).abs() < 1e-15, "{i}: {value}");
    }
}

#[test]
fn check_open_eval()
{
    let basis = Open;
    let mut points = vec![-1.0];
    points.extend((0..=25).map(|i| i as f64 / 25.0));
    points.push(2.0);
    let zeros = |n: usize| vec![0.0; n];
    let cases: Vec<(u32, u32, Vec<f64>)> = vec![
        (0, 0, [vec![0.0], vec![1.0; 26], vec![0.0]].concat()),
        (1, 0, [vec![0.0], vec![2.00, 1.84, 1.68, 1.52, 1.36, 1.20, 1.04, 0.88, 0.72, 0.56, 0.40, 0.24, 0.08], zeros(14)].concat()),
        (1, 2, [zeros(14), vec![0.08, 0.24, 0.40, 0.56, 0.72, 0.88, 1.04, 1.20, 1.36, 1.52, 1.68, 1.84, 2.00], vec![0.0]].concat()),
        (2, 0, [vec![0.0], vec![2.00, 1.68, 1.36, 1.04, 0.72, 0.40, 0.08], zeros(20)].concat()),
        (2, 2, [zeros(8), vec![0.24, 0.56, 0.88, 0.80, 0.48, 0.16], zeros(14)].concat()),
        (2, 4, [zeros(14), vec![0.16, 0.48, 0.80, 0.88, 0.56, 0.24], zeros(8)].concat()),
        (2, 6, [zeros(20), vec![0.08, 0.40, 0.72, 1.04, 1.36, 1.68, 2.00], vec![0.0]].concat()),
        (3, 2, [zeros(5), vec![0.56, 0.80, 0.16], zeros(20)].concat()),
        (3, 14, [zeros(23), vec![0.08, 0.72, 1.36, 2.00], vec![0.0]].concat()),
    ];
    for (level, order, expected) in cases
    {
        let values: Vec<f64> = points.iter().map(|&x| basis.eval(level, order, x)).collect();
        assert_close(&values, &expected, 1e-12);
    }
}

#[test]
fn check_open_integral()
{
    let basis = Open;
    assert_eq!(basis.integral(0, 0), 1.0);
    assert_eq!(basis.integral(1, 0), 0.5);
    assert_eq!(basis.integral(1, 2), 0.5);
    assert_eq!(basis.integral(2, 2), 0.125);
    assert_eq!(basis.integral(2, 6), 0.25);
}

#[test]
fn check_partition_of_unity()
{
    use crate::index::compose;
    let points = [0.0, 0.1, 0.333, 0.5, 0.9, 1.0];
    for &x in &points
    {
        for &y in &points
        {
            assert_eq!(Closed.compute(&[compose(0, 0), compose(0, 0)], &[x, y]), 1.0);
            assert_eq!(Open.compute(&[compose(0, 0), compose(0, 0)], &[x, y]), 1.0);
        }
    }
}
