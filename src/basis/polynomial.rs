use serde::{Deserialize, Serialize};

use crate::{errors::{AdaptError, AdaptResult}, grids::{base::Grid, equidistant}};

use super::base::Basis;

///
/// Local polynomial basis on the closed equidistant grid.
///
/// A function of level `l` lives on the same support as the hat function of
/// that node and is the Lagrange polynomial of degree `min(power, l)` through
/// the node, both ends of the support and the nearest further ancestors.
/// With `power == 1` it is the hat basis.
///
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Closed
{
    pub power: u32,
}

impl Default for Closed
{
    fn default() -> Self
    {
        Self { power: 1 }
    }
}

impl Closed
{
    pub fn new(power: u32) -> AdaptResult<Self>
    {
        if power == 0
        {
            return Err(AdaptError::Config("polynomial power must be positive".to_owned()));
        }
        Ok(Self { power })
    }

    #[inline]
    fn step(level: u32) -> f64
    {
        1.0 / 2.0_f64.powi(level as i32)
    }

    ///
    /// Interpolation points of the function `(level, order)` other than its
    /// own node. Empty for functions that reduce to the hat.
    ///
    fn roots(&self, level: u32, order: u32) -> Vec<f64>
    {
        let power = self.power.min(level);
        if power <= 1
        {
            return Vec::new();
        }
        let grid = equidistant::Closed;
        let node = grid.node(level, order);
        let step = Self::step(level);
        let (left, right) = (node - step, node + step);
        let mut roots = vec![left, right];
        let mut current = (level, order);
        while roots.len() < power as usize
        {
            let Some(parent) = grid.parent(current.0, current.1) else { break };
            let x = grid.node(parent.0, parent.1);
            if x != left && x != right
            {
                roots.push(x);
            }
            current = parent;
        }
        roots
    }
}

///
/// Integral over `[-step, step]` of `prod (s - r) / prod (-r)`, with every
/// root `r` given relative to the node.
///
fn integrate_lagrange(roots: &[f64], step: f64) -> f64
{
    // Coefficients in ascending powers of `s`.
    let mut coefficients = vec![1.0];
    let mut denominator = 1.0;
    for &root in roots
    {
        let mut next = vec![0.0; coefficients.len() + 1];
        for (n, &c) in coefficients.iter().enumerate()
        {
            next[n + 1] += c;
            next[n] -= c * root;
        }
        coefficients = next;
        denominator *= -root;
    }
    let mut integral = 0.0;
    for (n, &c) in coefficients.iter().enumerate()
    {
        let p = (n + 1) as i32;
        integral += c * (step.powi(p) - (-step).powi(p)) / p as f64;
    }
    integral / denominator
}

impl Basis for Closed
{
    fn eval(&self, level: u32, order: u32, x: f64) -> f64
    {
        if level == 0
        {
            return 1.0;
        }
        let node = equidistant::Closed.node(level, order);
        let step = Self::step(level);
        let distance = (x - node).abs();
        if distance >= step
        {
            return 0.0;
        }
        let roots = self.roots(level, order);
        if roots.is_empty()
        {
            return 1.0 - distance / step;
        }
        roots.iter().fold(1.0, |value, &root| value * (x - root) / (node - root))
    }

    fn integral(&self, level: u32, order: u32) -> f64
    {
        if level == 0
        {
            return 1.0;
        }
        let roots = self.roots(level, order);
        if roots.is_empty()
        {
            return if level == 1 { 0.25 } else { Self::step(level) };
        }
        let node = equidistant::Closed.node(level, order);
        let relative: Vec<f64> = roots.iter().map(|root| root - node).collect();
        integrate_lagrange(&relative, Self::step(level))
    }
}

#[test]
fn check_linear_power()
{
    let basis = Closed::new(1).unwrap();
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
    let hat = super::linear::Closed;
    for level in 0..5
    {
        assert_eq!(basis.integral(level, 1), hat.integral(level, 1));
        for i in 0..=32
        {
            let x = i as f64 / 32.0;
            assert_eq!(basis.eval(level, 1, x), hat.eval(level, 1, x));
        }
    }
}

#[test]
fn check_quadratic_power()
{
    let basis = Closed::new(2).unwrap();
    let orders = [1, 3, 5, 7];
    let expected = [
        0.0000000000000000e+00, 1.5359999999999999e-01, 2.9440000000000000e-01,
        4.2240000000000000e-01, 5.3759999999999997e-01, 6.4000000000000012e-01,
        7.2960000000000003e-01, 8.0640000000000001e-01, 8.7039999999999995e-01,
        9.2159999999999997e-01, 9.5999999999999996e-01, 9.8560000000000014e-01,
        9.9839999999999995e-01, 9.9839999999999995e-01, 9.8559999999999992e-01,
        9.5999999999999996e-01, 9.2159999999999997e-01, 8.7039999999999995e-01,
        8.0640000000000001e-01, 7.2960000000000003e-01, 6.3999999999999990e-01,
        5.3760000000000008e-01, 4.2240000000000000e-01, 2.9439999999999988e-01,
        1.5360000000000013e-01, 0.0000000000000000e+00, 1.5360000000000013e-01,
        2.9440000000000022e-01, 4.2240000000000033e-01, 5.3759999999999974e-01,
        6.3999999999999990e-01, 7.2960000000000003e-01, 8.0640000000000001e-01,
        8.7040000000000006e-01, 9.2160000000000009e-01, 9.5999999999999996e-01,
        9.8559999999999992e-01, 9.9839999999999995e-01, 9.9839999999999995e-01,
        9.8559999999999992e-01, 9.5999999999999996e-01, 9.2160000000000009e-01,
        8.7040000000000006e-01, 8.0640000000000001e-01, 7.2960000000000003e-01,
        6.3999999999999990e-01, 5.3759999999999974e-01, 4.2240000000000033e-01,
        2.9440000000000022e-01, 1.5360000000000013e-01, 0.0000000000000000e+00,
        1.5360000000000013e-01, 2.9440000000000022e-01, 4.2240000000000033e-01,
        5.3760000000000041e-01, 6.4000000000000046e-01, 7.2960000000000047e-01,
        8.0639999999999967e-01, 8.7039999999999973e-01, 9.2159999999999986e-01,
        9.5999999999999996e-01, 9.8559999999999992e-01, 9.9839999999999995e-01,
        9.9839999999999995e-01, 9.8559999999999992e-01, 9.5999999999999996e-01,
        9.2159999999999986e-01, 8.7039999999999973e-01, 8.0639999999999967e-01,
        7.2960000000000047e-01, 6.4000000000000046e-01, 5.3760000000000041e-01,
        4.2240000000000033e-01, 2.9440000000000022e-01, 1.5360000000000013e-01,
        0.0000000000000000e+00, 1.5360000000000013e-01, 2.9440000000000022e-01,
        4.2240000000000033e-01, 5.3760000000000041e-01, 6.4000000000000046e-01,
        7.2960000000000047e-01, 8.0639999999999967e-01, 8.7039999999999973e-01,
        9.2159999999999986e-01, 9.5999999999999996e-01, 9.8559999999999992e-01,
        9.9839999999999995e-01, 9.9839999999999995e-01, 9.8559999999999992e-01,
        9.5999999999999996e-01, 9.2159999999999986e-01, 8.7039999999999973e-01,
        8.0639999999999967e-01, 7.2960000000000047e-01, 6.4000000000000046e-01,
        5.3760000000000041e-01, 4.2240000000000033e-01, 2.9440000000000022e-01,
        1.5360000000000013e-01, 0.0000000000000000e+00,
    ];
    for (i, &value) in expected.iter().enumerate()
    {
        let x = i as f64 / 100.0;
        let sum: f64 = orders.iter().map(|&order| basis.eval(3, order, x)).sum();
        assert!((sum - value).abs() < 1e-14, "{x}: {sum} != {value}");
    }
}

#[test]
fn check_cubic_power()
{
    let basis = Closed::new(3).unwrap();
    // Node 1/8 interpolates through 0, 1/4 and its ancestor 1/2.
    assert_eq!(basis.roots(3, 1), vec![0.0, 0.25, 0.5]);
    assert_eq!(basis.eval(3, 1, 0.125), 1.0);
    assert_eq!(basis.eval(3, 1, 0.0), 0.0);
    assert_eq!(basis.eval(3, 1, 0.25), 0.0);
    assert!((basis.eval(3, 1, 0.0625) - 0.875).abs() < 1e-15);
    // Level two only has two ancestors, so the degree drops to two.
    assert_eq!(basis.roots(2, 3), vec![0.5, 1.0]);
    assert!((basis.eval(2, 3, 0.625) - 0.75).abs() < 1e-15);
}

#[test]
fn check_polynomial_integral()
{
    let quadratic = Closed::new(2).unwrap();
    let cubic = Closed::new(3).unwrap();
    assert_eq!(quadratic.integral(0, 0), 1.0);
    assert_eq!(quadratic.integral(1, 2), 0.25);
    assert!((quadratic.integral(3, 5) - 1.0 / 6.0).abs() < 1e-15);
    assert!((cubic.integral(3, 1) - 1.0 / 6.0).abs() < 1e-15);

    // Midpoint rule against the closed-form integral.
    for (level, order) in [(3, 3), (4, 5), (5, 17)]
    {
        let n = 20000;
        let sum: f64 = (0..n).map(|i| cubic.eval(level, order, (i as f64 + 0.5) / n as f64)).sum();
        assert!((sum / n as f64 - cubic.integral(level, order)).abs() < 1e-7);
    }
    assert!(Closed::new(0).is_err());
}
