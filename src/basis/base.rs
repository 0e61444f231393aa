use crate::index::decompose;

///
/// A one-dimensional hierarchical basis. Multi-dimensional basis functions are
/// tensor products of one-dimensional ones, one factor per codeword.
///
pub trait Basis : Sync
{
    /// Value of the basis function `(level, order)` at `x`; zero outside its support.
    fn eval(&self, level: u32, order: u32, x: f64) -> f64;

    /// Integral of the basis function `(level, order)` over the unit interval.
    fn integral(&self, level: u32, order: u32) -> f64;

    ///
    /// Evaluates the tensor-product basis function named by `index` at `point`.
    ///
    fn compute(&self, index: &[u64], point: &[f64]) -> f64
    {
        let mut value = 1.0;
        for (&word, &x) in index.iter().zip(point)
        {
            let (level, order) = decompose(word);
            let factor = self.eval(level, order, x);
            if factor == 0.0
            {
                return 0.0;
            }
            value *= factor;
        }
        value
    }

    ///
    /// Integrates the tensor-product basis function named by `index` over the unit cube.
    ///
    fn integrate(&self, index: &[u64]) -> f64
    {
        index.iter().map(|&word|
        {
            let (level, order) = decompose(word);
            self.integral(level, order)
        }).product()
    }
}
