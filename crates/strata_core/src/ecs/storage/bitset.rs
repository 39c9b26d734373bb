// bitset.rs - Growable component-composition mask
//
// Bit `n` lives in word `n >> 5` at position `n & 31`. Trailing zero words
// carry no meaning: equality, hashing and the canonical id all ignore them.

use std::fmt;
use std::hash::{Hash, Hasher};

const WORD_BITS: usize = 32;

#[inline]
fn word_of(bit: usize) -> usize {
    bit >> 5
}

#[inline]
fn mask_of(bit: usize) -> u32 {
    1 << (bit & 31)
}

/// Bit vector backed by 32-bit words.
#[derive(Clone, Default)]
pub struct BitSet {
    words: Vec<u32>,
}

impl BitSet {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Preallocate enough words to hold `bits` bits.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(WORD_BITS)],
        }
    }

    /// Ensure `word_index` is backed, zero-filling any new words.
    pub fn grow(&mut self, word_index: usize) {
        if word_index >= self.words.len() {
            self.words.resize(word_index + 1, 0);
        }
    }

    #[inline]
    fn word(&self, index: usize) -> u32 {
        self.words.get(index).copied().unwrap_or(0)
    }

    #[inline]
    pub fn contains_bit(&self, bit: usize) -> bool {
        self.word(word_of(bit)) & mask_of(bit) != 0
    }

    /// Set `bit` (or).
    pub fn insert(&mut self, bit: usize) {
        self.grow(word_of(bit));
        self.words[word_of(bit)] |= mask_of(bit);
    }

    /// Flip `bit` (xor).
    pub fn toggle(&mut self, bit: usize) {
        self.grow(word_of(bit));
        self.words[word_of(bit)] ^= mask_of(bit);
    }

    pub fn remove(&mut self, bit: usize) {
        if let Some(word) = self.words.get_mut(word_of(bit)) {
            *word &= !mask_of(bit);
        }
    }

    fn combine(&self, other: &BitSet, op: impl Fn(u32, u32) -> u32) -> BitSet {
        let len = self.words.len().max(other.words.len());
        BitSet {
            words: (0..len).map(|i| op(self.word(i), other.word(i))).collect(),
        }
    }

    pub fn union(&self, other: &BitSet) -> BitSet {
        self.combine(other, |a, b| a | b)
    }

    pub fn intersection(&self, other: &BitSet) -> BitSet {
        self.combine(other, |a, b| a & b)
    }

    pub fn difference(&self, other: &BitSet) -> BitSet {
        self.combine(other, |a, b| a & !b)
    }

    pub fn symmetric_difference(&self, other: &BitSet) -> BitSet {
        self.combine(other, |a, b| a ^ b)
    }

    /// Flip every bit within the currently backed words.
    pub fn complement(&self) -> BitSet {
        BitSet {
            words: self.words.iter().map(|w| !w).collect(),
        }
    }

    /// Whether every bit set in `other` is also set in `self`.
    pub fn contains(&self, other: &BitSet) -> bool {
        other
            .words
            .iter()
            .enumerate()
            .all(|(i, &w)| self.word(i) & w == w)
    }

    pub fn intersects(&self, other: &BitSet) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(a, b)| a & b != 0)
    }

    /// Set bit positions in ascending order.
    pub fn values(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut remaining = word;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of backed bits (always a multiple of 32).
    pub fn capacity_bits(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    fn significant(&self) -> &[u32] {
        let len = self
            .words
            .iter()
            .rposition(|&w| w != 0)
            .map_or(0, |i| i + 1);
        &self.words[..len]
    }

    /// Canonical string form: lowercase hex, most significant word first,
    /// inner words padded to eight digits. The empty set is `"0"`.
    pub fn canonical_id(&self) -> String {
        let words = self.significant();
        let Some((last, rest)) = words.split_last() else {
            return "0".to_string();
        };
        let mut id = format!("{last:x}");
        for word in rest.iter().rev() {
            id.push_str(&format!("{word:08x}"));
        }
        id
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for BitSet {}

impl Hash for BitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = BitSet::new();
        for bit in iter {
            set.insert(bit);
        }
        set
    }
}

impl fmt::Display for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_id())
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values()).finish()
    }
}
