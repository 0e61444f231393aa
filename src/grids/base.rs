use crate::index::{compose, decompose};

///
/// A nested one-dimensional hierarchical grid. The provided methods lift the
/// one-dimensional rules to flattened multi-indices of `ni` codewords each.
/// Every method must be deterministic.
///
pub trait Grid : Sync
{
    /// Coordinate in `[0, 1]` of the node `(level, order)`.
    fn node(&self, level: u32, order: u32) -> f64;

    /// Orders of the nodes introduced on `level`.
    fn orders(&self, level: u32) -> Vec<u32>;

    /// Children of the node `(level, order)` on the next level.
    fn children(&self, level: u32, order: u32) -> Vec<(u32, u32)>;

    /// Parent of the node `(level, order)`, `None` for the root.
    fn parent(&self, level: u32, order: u32) -> Option<(u32, u32)>;

    ///
    /// Coordinates of the nodes named by `indices`, one per codeword.
    ///
    fn compute(&self, indices: &[u64]) -> Vec<f64>
    {
        indices.iter().map(|&word|
        {
            let (level, order) = decompose(word);
            self.node(level, order)
        }).collect()
    }

    ///
    /// All multi-indices of the hierarchical increments named by the level
    /// indices in `lindices`. Within an increment the last dimension varies fastest.
    ///
    fn index(&self, lindices: &[u64], ni: usize) -> Vec<u64>
    {
        let mut indices = Vec::new();
        for lindex in lindices.chunks_exact(ni)
        {
            let orders: Vec<Vec<u32>> = lindex.iter().map(|&level| self.orders(level as u32)).collect();
            if orders.iter().any(|o| o.is_empty())
            {
                continue;
            }
            let mut cursor = vec![0_usize; ni];
            'increment: loop
            {
                for d in 0..ni
                {
                    indices.push(compose(lindex[d] as u32, orders[d][cursor[d]]));
                }
                let mut d = ni;
                loop
                {
                    if d == 0
                    {
                        break 'increment;
                    }
                    d -= 1;
                    cursor[d] += 1;
                    if cursor[d] < orders[d].len()
                    {
                        break;
                    }
                    cursor[d] = 0;
                }
            }
        }
        indices
    }

    ///
    /// Children of every multi-index in `indices` along every dimension.
    /// Duplicates are not removed.
    ///
    fn refine(&self, indices: &[u64], ni: usize) -> Vec<u64>
    {
        let mut children = Vec::new();
        for index in indices.chunks_exact(ni)
        {
            for dim in 0..ni
            {
                children.extend(self.refine_toward(index, dim));
            }
        }
        children
    }

    ///
    /// Children of a single multi-index along dimension `dim` only.
    ///
    fn refine_toward(&self, index: &[u64], dim: usize) -> Vec<u64>
    {
        let (level, order) = decompose(index[dim]);
        let mut children = Vec::new();
        for (child_level, child_order) in self.children(level, order)
        {
            debug_assert_eq!(self.parent(child_level, child_order), Some((level, order)));
            children.extend_from_slice(index);
            let offset = children.len() - index.len();
            children[offset + dim] = compose(child_level, child_order);
        }
        children
    }
}
