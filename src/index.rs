mod basic;
mod forest;
mod multiprobe;
mod probe;
mod table;
mod trie;

use std::hash::Hash;

pub use basic::BasicIndex;
pub use forest::ForestIndex;
pub use multiprobe::MultiprobeIndex;
pub use probe::{PerturbSet, ProbeSequence};
pub use table::canonical_key;

/// Trait of identifiers stored in the indexes.
pub trait Id: Clone + Eq + Hash + Send + Sync {}

impl<I: Clone + Eq + Hash + Send + Sync> Id for I {}
