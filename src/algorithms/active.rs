use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

const NONE: usize = usize::MAX;

///
/// Tracks the frontier of a downward-closed set of level indices.
///
/// Every level index ever admitted keeps its position. An index is active
/// from admission until it is dropped, and passive afterwards. The forward and
/// backward tables link each index to its neighbours one level up or down in
/// every dimension.
///
#[derive(Clone, Debug)]
pub struct Active
{
    ni: usize,
    positions: IndexSet<usize, FxBuildHasher>,
    indices: Vec<u64>,
    forward: Vec<usize>,
    backward: Vec<usize>,
}

impl Active
{
    pub fn new(ni: usize) -> Self
    {
        Self
        {
            ni,
            positions: IndexSet::default(),
            indices: Vec::new(),
            forward: Vec::new(),
            backward: Vec::new(),
        }
    }

    ///
    /// Resets the tracker to the single zero level index, which becomes active.
    ///
    pub fn first(&mut self) -> Vec<u64>
    {
        let ni = self.ni;
        self.positions.clear();
        self.positions.insert(0);
        self.indices = vec![0; ni];
        self.forward = vec![NONE; ni];
        self.backward = vec![NONE; ni];
        self.indices.clone()
    }

    ///
    /// Moves `k` from the active to the passive part. Dropping a passive or
    /// unknown position has no effect.
    ///
    pub fn drop(&mut self, k: usize)
    {
        self.positions.shift_remove(&k);
    }

    ///
    /// Admits the forward neighbours of `k` that keep the set admissible and
    /// returns them. A neighbour `k + e_i` is admitted only if, for every other
    /// dimension `j` in which `k` has a backward neighbour `k - e_j`, the index
    /// `k - e_j + e_i` already exists and is passive.
    ///
    /// `k` itself stays active until it is dropped.
    ///
    pub fn next(&mut self, k: usize) -> Vec<u64>
    {
        let ni = self.ni;
        let no = self.indices.len() / ni;
        let mut nn = 0;
        for i in 0..ni
        {
            if self.forward[k * ni + i] != NONE
            {
                continue;
            }
            let mut backward = vec![NONE; ni];
            let mut admissible = true;
            for j in 0..ni
            {
                if i == j
                {
                    backward[j] = k;
                    continue;
                }
                let l = self.backward[k * ni + j];
                if l == NONE
                {
                    continue;
                }
                let l = self.forward[l * ni + i];
                if l == NONE || self.positions.contains(&l)
                {
                    admissible = false;
                    break;
                }
                backward[j] = l;
            }
            if !admissible
            {
                continue;
            }

            let position = no + nn;
            let mut index = self.indices[k * ni..(k + 1) * ni].to_vec();
            index[i] += 1;
            self.indices.extend(index);
            self.forward.extend(std::iter::repeat(NONE).take(ni));
            self.backward.extend_from_slice(&backward);
            for (j, &l) in backward.iter().enumerate()
            {
                if l != NONE
                {
                    self.forward[l * ni + j] = position;
                }
            }
            nn += 1;
        }
        for position in no..no + nn
        {
            self.positions.insert(position);
        }
        self.indices[no * ni..].to_vec()
    }

    ///
    /// Active positions in the order they were admitted.
    ///
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_
    {
        self.positions.iter().copied()
    }

    pub fn is_active(&self, k: usize) -> bool
    {
        self.positions.contains(&k)
    }

    pub fn num_active(&self) -> usize
    {
        self.positions.len()
    }

    /// Number of level indices admitted so far, active or passive.
    pub fn len(&self) -> usize
    {
        self.indices.len() / self.ni
    }

    pub fn is_empty(&self) -> bool
    {
        self.indices.is_empty()
    }

    pub fn index(&self, k: usize) -> &[u64]
    {
        &self.indices[k * self.ni..(k + 1) * self.ni]
    }
}

#[test]
fn check_first_expansions()
{
    let mut active = Active::new(2);
    assert_eq!(active.first(), vec![0, 0]);
    assert_eq!(active.next(0), vec![1, 0, 0, 1]);
    active.drop(0);

    // [1, 1] waits until [0, 1] is passive.
    assert_eq!(active.next(1), vec![2, 0]);
    active.drop(1);
    assert_eq!(active.next(2), vec![1, 1, 0, 2]);
    active.drop(2);

    assert_eq!(active.positions().collect::<Vec<_>>(), vec![3, 4, 5]);
    assert_eq!(active.index(4), &[1, 1]);
    assert_eq!(active.len(), 6);
}

#[test]
fn check_expansion_is_not_repeated()
{
    let mut active = Active::new(2);
    active.first();
    active.next(0);
    active.drop(0);
    active.next(1);
    active.drop(1);
    active.next(2);
    active.drop(2);
    // Both forward neighbours of [1, 0] exist by now.
    assert!(active.next(1).is_empty());
    assert_eq!(active.len(), 6);
    assert_eq!(active.num_active(), 3);
}

#[test]
fn check_admissibility()
{
    let ni = 3;
    let mut active = Active::new(ni);
    active.first();
    let mut dropped = Vec::new();
    let mut previous: Option<usize> = None;
    let mut seed = 0x2545_F491_4F6C_DD1D_u64;
    for _ in 0..150
    {
        if let Some(k) = previous
        {
            active.drop(k);
            dropped.push(k);
        }
        let positions: Vec<usize> = active.positions().collect();
        if positions.is_empty()
        {
            break;
        }
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let k = positions[(seed % positions.len() as u64) as usize];

        let known: Vec<Vec<u64>> = (0..active.len()).map(|p| active.index(p).to_vec()).collect();
        let was_active: Vec<bool> = (0..active.len()).map(|p| active.is_active(p)).collect();
        let fresh = active.next(k);
        for child in fresh.chunks_exact(ni)
        {
            assert!(!known.iter().any(|index| index == child), "{child:?} admitted twice");
            for j in 0..ni
            {
                if child[j] == 0
                {
                    continue;
                }
                let mut parent = child.to_vec();
                parent[j] -= 1;
                let position = known.iter().position(|index| *index == parent);
                assert!(position.is_some(), "{child:?} admitted before {parent:?}");
                let position = position.unwrap();
                assert!(position == k || !was_active[position], "{child:?} admitted while {parent:?} is active");
            }
        }
        previous = Some(k);
    }
    for k in dropped
    {
        assert!(!active.is_active(k));
    }
}
