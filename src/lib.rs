//! # e2lsh-rs
//!
//! Rust implementation of locality-sensitive hashing (LSH) for approximate nearest neighbor searches in the Euclidean space,
//! using the p-stable hash family described in the paper
//!
//! > Datar, Immorlica, Indyk, and Mirrokni, **Locality-sensitive hashing scheme based on p-stable distributions**, *SoCG*, 2004.
//!
//! ## Features
//!
//! - **Three index variants** built on the same hash family:
//!   - [`BasicIndex`] hashes points into `l` tables of concatenated keys.
//!   - [`ForestIndex`] stores the keys in prefix trees (LSH Forest), so that the number of matched hash values can be lowered until enough candidates are found.
//!   - [`MultiprobeIndex`] also probes nearby buckets with perturbed keys (Multi-probe LSH), trading lookups for fewer tables.
//!
//! - **Concurrent:** Every table is guarded by its own lock, and inserts, queries and deletes fan out over the tables in parallel.
//!
//! - **Reproducible:** The hash functions are drawn from a seeded generator, so two indexes built with the same parameters hash identically.
//!
//! The indexes return unsorted candidate sets. Re-rank them by the true distance, e.g., with [`eval::rerank`].
//!
//! ## Example
//!
//! ```rust
//! use e2lsh_rs::{BasicIndex, ForestIndex};
//!
//! fn main() {
//!     // Database of 2-dimensional points
//!     let points: [[f64; 2]; 4] = [[0.0, 0.0], [0.1, 0.2], [5.0, 5.0], [9.0, -3.0]];
//!
//!     // Construct the indexes with 4 tables of 2 hash values and slot width 1.0
//!     let basic = BasicIndex::new(2, 4, 2, 1.0).unwrap();
//!     let forest = ForestIndex::new(2, 4, 2, 1.0).unwrap();
//!     for (id, p) in points.iter().enumerate() {
//!         basic.insert(p, id).unwrap();
//!         forest.insert(p, id).unwrap();
//!     }
//!
//!     // Candidates colliding with the query in at least one table
//!     let answers = basic.query(&points[1]).unwrap();
//!     assert!(answers.contains(&1));
//!
//!     // Relax the forest lookups until at least 4 candidates are found
//!     let answers = forest.query_top_k(&points[0], 4).unwrap();
//!     assert_eq!(answers.len(), 4);
//! }
//! ```
//!
//! ## Point types
//!
//! Points are slices of a `Scalar` type, currently implemented for `u8`, `f32`, and `f64`.

/// The hash family shared by the indexes.
pub mod hash;

/// LSH index variants.
pub mod index;

/// Exhaustive search functions.
pub mod ls;

/// A generic trait of supported point coordinates.
pub mod scalar;

pub mod error;
pub mod eval;
pub mod params;
pub mod parser;

pub use error::{Error, Result};
pub use hash::{HashFamily, TableKey};
pub use index::{BasicIndex, ForestIndex, Id, MultiprobeIndex};
pub use params::Params;
pub use scalar::Scalar;

/// Gets the dot product of a point and a projection vector.
pub fn dot<T: Scalar>(x: &[T], y: &[f64]) -> f64 {
    x.iter().zip(y.iter()).map(|(&a, &b)| a.as_f64() * b).sum()
}

/// Gets the Euclidean distance between two points.
pub fn l2<T: Scalar>(x: &[T], y: &[T]) -> f64 {
    x.iter()
        .zip(y.iter())
        .map(|(&a, &b)| {
            let d = a.as_f64() - b.as_f64();
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
