use rustc_hash::FxHashSet;

const WORD_BYTES: usize = std::mem::size_of::<u64>();

///
/// Builds canonical lookup keys for multi-indices of a fixed length.
///
/// A key is the concatenation of every word serialized little-endian, so the
/// same multi-index yields the same bytes on every platform.
///
#[derive(Clone, Debug)]
pub struct Hash
{
    ni: usize,
}

impl Hash
{
    pub fn new(ni: usize) -> Self
    {
        Self { ni }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.ni
    }

    pub fn key(&self, index: &[u64]) -> Vec<u8>
    {
        debug_assert_eq!(index.len(), self.ni);
        let mut key = Vec::with_capacity(self.ni * WORD_BYTES);
        for word in index
        {
            key.extend(word.to_le_bytes());
        }
        key
    }
}

///
/// Filters out multi-indices that have been seen before, either in an earlier
/// call or earlier in the same batch. Remembers everything it has seen.
///
#[derive(Clone, Debug)]
pub struct Unique
{
    hash: Hash,
    seen: FxHashSet<Vec<u8>>,
}

impl Unique
{
    pub fn new(ni: usize) -> Self
    {
        Self { hash: Hash::new(ni), seen: FxHashSet::default() }
    }

    ///
    /// Keeps the first occurrence of every unseen multi-index, in encounter
    /// order. The batch is compacted in place and truncated.
    /// With zero inputs there is nothing to tell apart and the result is empty.
    ///
    pub fn distil(&mut self, mut indices: Vec<u64>) -> Vec<u64>
    {
        let ni = self.hash.num_inputs();
        if ni == 0
        {
            indices.clear();
            return indices;
        }
        let nn = indices.len() / ni;
        let mut kept = 0;
        for i in 0..nn
        {
            let key = self.hash.key(&indices[i * ni..(i + 1) * ni]);
            if self.seen.insert(key)
            {
                if i > kept
                {
                    indices.copy_within(i * ni..(i + 1) * ni, kept * ni);
                }
                kept += 1;
            }
        }
        indices.truncate(kept * ni);
        indices
    }

    pub fn contains(&self, index: &[u64]) -> bool
    {
        self.seen.contains(&self.hash.key(index))
    }

    pub fn len(&self) -> usize
    {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.seen.is_empty()
    }
}

#[test]
fn check_unique()
{
    let mut unique = Unique::new(2);
    assert_eq!(unique.distil(vec![4, 2]), vec![4, 2]);
    assert_eq!(unique.distil(vec![6, 9]), vec![6, 9]);
    assert_eq!(unique.distil(vec![4, 2]), Vec::<u64>::new());
    assert_eq!(unique.len(), 2);
    assert!(unique.contains(&[6, 9]));
    assert!(!unique.contains(&[9, 6]));
}

#[test]
fn check_key_is_little_endian()
{
    let hash = Hash::new(2);
    assert_eq!(hash.key(&[4, 2]), vec![4, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(hash.key(&[0x0102, 0]), vec![2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn check_unique_within_batch()
{
    let mut unique = Unique::new(2);
    let batch = vec![1, 2, 3, 4, 1, 2, 5, 6, 3, 4, 7, 8];
    assert_eq!(unique.distil(batch), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(unique.distil(vec![9, 9, 5, 6, 9, 9]), vec![9, 9]);
    assert!(unique.distil(Vec::new()).is_empty());
}

#[test]
fn check_unique_is_idempotent()
{
    let batch = vec![3, 1, 3, 1, 2, 2, 0, 0, 2, 2, 3, 1];
    let once = Unique::new(2).distil(batch.clone());
    let twice = Unique::new(2).distil(once.clone());
    assert_eq!(once, twice);

    let mut unique = Unique::new(2);
    unique.distil(batch.clone());
    assert!(unique.distil(batch).is_empty());
}

#[test]
fn check_unique_without_inputs()
{
    let mut unique = Unique::new(0);
    assert!(unique.distil(vec![1, 2, 3]).is_empty());
    assert!(unique.distil(Vec::new()).is_empty());
    assert!(unique.is_empty());
    assert!(Hash::new(0).key(&[]).is_empty());
}
