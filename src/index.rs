use bitfield_struct::bitfield;

///
/// One dimension of a multi-index: the level lives in the low 32 bits and the
/// order in the high 32 bits.
///
#[bitfield(u64)]
#[derive(PartialEq, Eq, Hash)]
pub struct Codeword
{
    pub level: u32,
    pub order: u32,
}

#[inline]
pub fn compose(level: u32, order: u32) -> u64
{
    Codeword::new().with_level(level).with_order(order).into_bits()
}

#[inline]
pub fn decompose(word: u64) -> (u32, u32)
{
    let codeword = Codeword::from_bits(word);
    (codeword.level(), codeword.order())
}

#[inline]
pub fn level(word: u64) -> u32
{
    Codeword::from_bits(word).level()
}

#[inline]
pub fn order(word: u64) -> u32
{
    Codeword::from_bits(word).order()
}

///
/// Total level of a single multi-index.
///
#[inline]
pub fn level_sum(index: &[u64]) -> u64
{
    index.iter().map(|&word| level(word) as u64).sum()
}

///
/// Packs parallel level and order sequences into codewords.
///
pub fn compose_all(levels: &[u32], orders: &[u32]) -> Vec<u64>
{
    levels.iter().zip(orders).map(|(&level, &order)| compose(level, order)).collect()
}

///
/// Total level of every multi-index in a flattened sequence of `ni`-word indices.
///
pub fn levelize(indices: &[u64], ni: usize) -> Vec<u64>
{
    indices.chunks_exact(ni).map(level_sum).collect()
}

#[test]
fn check_codec_round_trip()
{
    let levels = [0, 1, 2, 31, 32, 1 << 16, u32::MAX - 1, u32::MAX];
    let orders = [0, 2, 3, 7, 1 << 31, 12345, u32::MAX, 1];
    for &l in &levels
    {
        for &o in &orders
        {
            let word = compose(l, o);
            assert_eq!(level(word), l);
            assert_eq!(order(word), o);
            assert_eq!(decompose(word), (l, o));
        }
    }
}

#[test]
fn check_codec_layout()
{
    assert_eq!(compose(3, 5), 3 | (5 << 32));
    assert_eq!(compose(u32::MAX, 0), 0xFFFF_FFFF);
    assert_eq!(compose(0, u32::MAX), 0xFFFF_FFFF_0000_0000);
}

#[test]
fn check_levelize()
{
    let indices = compose_all(&[0, 0, 1, 0, 2, 3], &[0, 0, 0, 0, 1, 5]);
    assert_eq!(levelize(&indices, 2), vec![0, 1, 5]);
    assert_eq!(level_sum(&indices[4..6]), 5);
    assert!(levelize(&[], 3).is_empty());
}
