use serde::{Deserialize, Serialize};

use super::base::Grid;

///
/// Equidistant grid on `[0, 1]` including the boundary. Level zero is the
/// midpoint, level one adds both endpoints, deeper levels bisect.
///
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Closed;

impl Grid for Closed
{
    #[inline]
    fn node(&self, level: u32, order: u32) -> f64
    {
        if level == 0
        {
            0.5
        }
        else
        {
            order as f64 / 2.0_f64.powi(level as i32)
        }
    }

    fn orders(&self, level: u32) -> Vec<u32>
    {
        match level
        {
            0 => vec![0],
            1 => vec![0, 2],
            _ => (1..(1_u64 << level)).step_by(2).map(|order| order as u32).collect(),
        }
    }

    fn children(&self, level: u32, order: u32) -> Vec<(u32, u32)>
    {
        match (level, order)
        {
            (0, _) => vec![(1, 0), (1, 2)],
            (1, 0) => vec![(2, 1)],
            (1, _) => vec![(2, 3)],
            _ => vec![(level + 1, 2 * order - 1), (level + 1, 2 * order + 1)],
        }
    }

    fn parent(&self, level: u32, order: u32) -> Option<(u32, u32)>
    {
        match level
        {
            0 => None,
            1 => Some((0, 0)),
            2 => Some((1, order - 1)),
            _ => Some((level - 1, ((order - 1) / 2) | 1)),
        }
    }
}

///
/// Equidistant grid on `[0, 1]` excluding the boundary. Level `l` holds
/// `2^l` nodes at the odd multiples of `2^-(l+1)`.
///
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Open;

impl Grid for Open
{
    #[inline]
    fn node(&self, level: u32, order: u32) -> f64
    {
        if level == 0
        {
            0.5
        }
        else
        {
            (order as f64 + 1.0) / 2.0_f64.powi(level as i32 + 1)
        }
    }

    fn orders(&self, level: u32) -> Vec<u32>
    {
        if level == 0
        {
            return vec![0];
        }
        (0..(2_u64 << level) - 1).step_by(2).map(|order| order as u32).collect()
    }

    fn children(&self, level: u32, order: u32) -> Vec<(u32, u32)>
    {
        if level == 0
        {
            vec![(1, 0), (1, 2)]
        }
        else
        {
            vec![(level + 1, 2 * order), (level + 1, 2 * order + 2)]
        }
    }

    fn parent(&self, level: u32, order: u32) -> Option<(u32, u32)>
    {
        match level
        {
            0 => None,
            1 => Some((0, 0)),
            _ if (order / 2) % 2 == 0 => Some((level - 1, order / 2)),
            _ => Some((level - 1, order / 2 - 1)),
        }
    }
}

#[test]
fn check_closed_parent()
{
    let grid = Closed;
    let children = [(1, 0), (1, 2), (2, 1), (2, 3), (3, 1), (3, 3), (3, 5), (3, 7)];
    let parents = [(0, 0), (0, 0), (1, 0), (1, 2), (2, 1), (2, 1), (2, 3), (2, 3)];
    for (&(level, order), &parent) in children.iter().zip(&parents)
    {
        assert_eq!(grid.parent(level, order), Some(parent));
        assert!(grid.children(parent.0, parent.1).contains(&(level, order)));
    }
    assert_eq!(grid.parent(0, 0), None);
}

#[test]
fn check_open_parent()
{
    let grid = Open;
    for level in 1..5
    {
        for order in grid.orders(level)
        {
            let (parent_level, parent_order) = grid.parent(level, order).unwrap();
            assert!(grid.children(parent_level, parent_order).contains(&(level, order)));
        }
    }
}

#[test]
fn check_orders_match_children()
{
    // Children of all nodes of one level are exactly the nodes of the next level.
    fn check<G: Grid>(grid: &G)
    {
        for level in 0..6
        {
            let mut children: Vec<u32> = grid.orders(level).iter()
                .flat_map(|&order| grid.children(level, order))
                .map(|(child_level, child_order)|
                {
                    assert_eq!(child_level, level + 1);
                    child_order
                })
                .collect();
            children.sort_unstable();
            children.dedup();
            assert_eq!(children, grid.orders(level + 1));
        }
    }
    check(&Closed);
    check(&Open);
}

#[test]
fn check_nodes()
{
    use crate::index::compose;
    let indices = [compose(0, 0), compose(1, 0), compose(1, 2), compose(2, 1), compose(3, 7)];
    assert_eq!(Closed.compute(&indices), vec![0.5, 0.0, 1.0, 0.25, 0.875]);
    let indices = [compose(0, 0), compose(1, 0), compose(1, 2), compose(2, 6)];
    assert_eq!(Open.compute(&indices), vec![0.5, 0.25, 0.75, 0.875]);
}

#[test]
fn check_index()
{
    use crate::index::{compose, decompose};
    let grid = Closed;
    let indices = grid.index(&[2, 1], 2);
    assert_eq!(indices.len(), 2 * 2 * 2);
    let pairs: Vec<(u32, u32)> = indices.iter().map(|&word| decompose(word)).collect();
    assert_eq!(pairs, vec![(2, 1), (1, 0), (2, 1), (1, 2), (2, 3), (1, 0), (2, 3), (1, 2)]);
    assert_eq!(grid.index(&[0, 0, 0, 3], 2).len(), 2 + 2 * 4);
    assert_eq!(grid.index(&[0, 0], 2), vec![compose(0, 0), compose(0, 0)]);
}

#[test]
fn check_refine()
{
    use crate::index::compose;
    let grid = Closed;
    let root = [compose(0, 0), compose(0, 0)];
    let children = grid.refine(&root, 2);
    assert_eq!(children, vec![
        compose(1, 0), compose(0, 0),
        compose(1, 2), compose(0, 0),
        compose(0, 0), compose(1, 0),
        compose(0, 0), compose(1, 2),
    ]);
    let toward = grid.refine_toward(&[compose(2, 3), compose(1, 0)], 1);
    assert_eq!(toward, vec![compose(2, 3), compose(2, 1)]);
}

#[test]
fn check_refine_agrees_with_parent()
{
    use crate::index::{compose, decompose};
    fn check<G: Grid>(grid: &G)
    {
        let mut frontier = vec![compose(0, 0), compose(0, 0)];
        for _ in 0..4
        {
            let mut next = Vec::new();
            for index in frontier.chunks_exact(2)
            {
                for dim in 0..2
                {
                    let children = grid.refine_toward(index, dim);
                    assert!(!children.is_empty());
                    for child in children.chunks_exact(2)
                    {
                        assert_eq!(child[1 - dim], index[1 - dim]);
                        let (level, order) = decompose(child[dim]);
                        assert_eq!(grid.parent(level, order), Some(decompose(index[dim])));
                    }
                    next.extend(children);
                }
            }
            frontier = next;
        }
    }
    check(&Closed);
    check(&Open);
}
