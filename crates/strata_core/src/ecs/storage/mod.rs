// mod.rs - Storage building blocks shared by every archetype table

mod bitset;
mod column;
mod sparse_set;

pub use bitset::BitSet;
pub use column::{Column, ColumnError};
pub use sparse_set::{SparseKey, SparseSet};
