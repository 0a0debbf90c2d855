use std::collections::HashSet;

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::error::Result;
use crate::hash::{HashFamily, TableKey};
use crate::index::table::{canonical_keys, Table};
use crate::index::Id;
use crate::params::Params;
use crate::Scalar;

/// The basic LSH index for the L2 distance, consisting of `l`
/// independent hash tables.
pub struct BasicIndex<I> {
    family: HashFamily,
    tables: Vec<RwLock<Table<I>>>,
}

impl<I: Id> BasicIndex<I> {
    /// Constructs an empty index with the default seed.
    /// `dim` is the dimensionality of points, `l` is the number of tables,
    /// `m` is the number of hash values concatenated into a key, and
    /// `w` is the slot width of the hash functions.
    pub fn new(dim: usize, l: usize, m: usize, w: f64) -> Result<Self> {
        Self::with_params(&Params::new(dim, l, m, w))
    }

    /// Constructs an empty index from the parameters.
    /// If invalid inputs are given, returns Error::InvalidParameter.
    pub fn with_params(params: &Params) -> Result<Self> {
        let family = HashFamily::new(params)?;
        let tables = (0..params.l).map(|_| RwLock::default()).collect();
        Ok(Self { family, tables })
    }

    /// Inserts `id` into every table under the key of `point`.
    /// Returns after all the tables are updated.
    pub fn insert<T: Scalar>(&self, point: &[T], id: I) -> Result<()> {
        let keys = canonical_keys(&self.family.hash(point)?);
        self.tables
            .par_iter()
            .zip(keys.into_par_iter())
            .for_each(|(table, key)| table.write().insert(key, id.clone()));
        Ok(())
    }

    /// Finds the ids colliding with `point` in at least one table.
    /// Returns them deduplicated in arbitrary order.
    pub fn query<T: Scalar>(&self, point: &[T]) -> Result<HashSet<I>> {
        let keys = self.family.hash(point)?;
        let mut answers = HashSet::new();
        self.lookup_keys(&keys, &mut answers);
        Ok(answers)
    }

    /// Removes all the occurrences of `id` from every table.
    pub fn delete(&self, id: &I) {
        let removed: usize = self
            .tables
            .par_iter()
            .map(|table| table.write().remove(id))
            .sum();
        tracing::debug!(removed, "deleted id from basic index");
    }

    /// Gets the bucket size of the key of `point` in each table.
    pub fn bucket_sizes<T: Scalar>(&self, point: &[T]) -> Result<Vec<usize>> {
        let keys = canonical_keys(&self.family.hash(point)?);
        Ok(self
            .tables
            .iter()
            .zip(keys.iter())
            .map(|(table, key)| table.read().get_size(key))
            .collect())
    }

    /// Gets the number of non-empty buckets in each table.
    pub fn num_buckets(&self) -> Vec<usize> {
        self.tables.iter().map(|t| t.read().num_buckets()).collect()
    }

    pub fn family(&self) -> &HashFamily {
        &self.family
    }

    /// Adds the ids stored under `keys` (one key per table) to answers.
    pub(crate) fn lookup_keys(&self, keys: &[TableKey], answers: &mut HashSet<I>) {
        debug_assert_eq!(keys.len(), self.tables.len());

        let hits: Vec<Vec<I>> = self
            .tables
            .par_iter()
            .zip(canonical_keys(keys).par_iter())
            .map(|(table, key)| {
                table
                    .read()
                    .access(key)
                    .map(|a| a.to_vec())
                    .unwrap_or_default()
            })
            .collect();

        for ids in hits {
            answers.extend(ids);
        }
    }
}
