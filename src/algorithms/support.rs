use rayon::{iter::{IndexedParallelIterator, ParallelIterator}, slice::{ParallelSlice, ParallelSliceMut}};

use crate::basis::base::Basis;

#[inline]
pub fn max_absolute(data: &[f64]) -> f64
{
    data.iter().fold(0.0, |max, value| f64::max(max, value.abs()))
}

///
/// Volume (integral over the unit cube) of every basis function in `indices`.
///
pub fn measure<B: Basis>(basis: &B, indices: &[u64], ni: usize) -> Vec<f64>
{
    indices.chunks_exact(ni).map(|index| basis.integrate(index)).collect()
}

///
/// Evaluates the expansion given by `indices` and `surpluses` at every point
/// in `points`. Points are processed in parallel.
///
pub fn approximate<B: Basis>(basis: &B, indices: &[u64], surpluses: &[f64], points: &[f64], ni: usize, no: usize) -> Vec<f64>
{
    let mut values = vec![0.0; points.len() / ni * no];
    points.par_chunks_exact(ni).zip(values.par_chunks_exact_mut(no)).for_each(
        |(point, value)|
        {
            for (index, surplus) in indices.chunks_exact(ni).zip(surpluses.chunks_exact(no))
            {
                let weight = basis.compute(index, point);
                if weight == 0.0
                {
                    continue;
                }
                for (v, s) in value.iter_mut().zip(surplus)
                {
                    *v += weight * s;
                }
            }
        }
    );
    values
}

///
/// Element-wise `minuend - subtrahend`.
///
#[inline]
pub fn subtract(minuend: &[f64], subtrahend: &[f64]) -> Vec<f64>
{
    minuend.iter().zip(subtrahend).map(|(a, b)| a - b).collect()
}

#[test]
fn check_max_absolute()
{
    assert_eq!(max_absolute(&[]), 0.0);
    assert_eq!(max_absolute(&[0.5, -2.0, 1.0]), 2.0);
}

#[test]
fn check_approximate()
{
    use crate::{basis::linear::Closed, index::compose};
    let basis = Closed;
    // 1 + 0.5 * hat(1, 2) + 0.25 * hat(2, 1)
    let indices = [compose(0, 0), compose(1, 2), compose(2, 1)];
    let surpluses = [1.0, 0.5, 0.25];
    let values = approximate(&basis, &indices, &surpluses, &[0.0, 0.25, 0.5, 1.0], 1, 1);
    assert_eq!(values, vec![1.0, 1.25, 1.0, 1.5]);
    assert_eq!(measure(&basis, &indices, 1), vec![1.0, 0.25, 0.25]);
    assert_eq!(subtract(&[3.0, 1.0], &[1.0, 2.0]), vec![2.0, -1.0]);
}
