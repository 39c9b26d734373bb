// sparse_set.rs - O(1) membership index with swap-removal
//
// `sparse[key]` holds the dense slot of `key`; `dense` holds the keys in
// packed order. The dense order is the row order of every archetype table.

use crate::ecs::Entity;

const EMPTY: u32 = u32::MAX;

/// Keys that can index the sparse half of a [`SparseSet`].
pub trait SparseKey: Copy + Eq {
    fn to_index(self) -> usize;
}

impl SparseKey for u32 {
    #[inline]
    fn to_index(self) -> usize {
        self as usize
    }
}

impl SparseKey for Entity {
    #[inline]
    fn to_index(self) -> usize {
        self.index() as usize
    }
}

/// Packed set of small integer keys.
///
/// Stale sparse slots are tolerated: membership is always confirmed against
/// the dense array, so a slot left behind by a removal never reports a
/// false positive.
#[derive(Clone, Debug)]
pub struct SparseSet<K> {
    sparse: Vec<u32>,
    dense: Vec<K>,
}

impl<K: SparseKey> SparseSet<K> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }

    /// Insert `key`. Returns `false` if it was already present.
    pub fn insert(&mut self, key: K) -> bool {
        if self.contains(key) {
            return false;
        }
        let index = key.to_index();
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, EMPTY);
        }
        self.sparse[index] = self.dense.len() as u32;
        self.dense.push(key);
        true
    }

    /// Remove `key` by swapping the last dense entry into its slot.
    ///
    /// Returns the key that was popped off the end of the dense array (equal
    /// to `key` when it was already last), or `None` if `key` was absent.
    pub fn remove(&mut self, key: K) -> Option<K> {
        let slot = self.dense_index(key)?;
        let last = self.dense.pop()?;
        if slot < self.dense.len() {
            self.dense[slot] = last;
            self.sparse[last.to_index()] = slot as u32;
        }
        self.sparse[key.to_index()] = EMPTY;
        Some(last)
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.dense_index(key).is_some()
    }

    /// Dense slot (row) of `key`.
    #[inline]
    pub fn dense_index(&self, key: K) -> Option<usize> {
        let slot = *self.sparse.get(key.to_index())?;
        if slot == EMPTY {
            return None;
        }
        let slot = slot as usize;
        (self.dense.get(slot) == Some(&key)).then_some(slot)
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<K> {
        self.dense.get(slot).copied()
    }

    #[inline]
    pub fn dense(&self) -> &[K] {
        &self.dense
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.dense.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
    }
}

impl<K: SparseKey> Default for SparseSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
