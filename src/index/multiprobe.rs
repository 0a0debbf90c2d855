use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::index::basic::BasicIndex;
use crate::index::probe::{PerturbSet, ProbeSequence};
use crate::index::Id;
use crate::params::Params;
use crate::Scalar;

/// Multi-probe LSH by Lv et al. on top of [`BasicIndex`].
///
/// Besides the bucket of the base key, a query visits the buckets of `t`
/// perturbed keys per table, in ascending order of the perturbation scores.
/// It does not support k-NN queries directly; candidates are meant to be
/// re-ranked by the caller.
pub struct MultiprobeIndex<I> {
    basic: BasicIndex<I>,
    probes: ProbeSequence,
}

impl<I: Id> MultiprobeIndex<I> {
    /// Constructs an empty index with the default seed.
    /// `t` is the number of perturbed keys probed per table in addition to
    /// the base key; increasing it increases the query time.
    pub fn new(dim: usize, l: usize, m: usize, w: f64, t: usize) -> Result<Self> {
        Self::with_params(&Params::new(dim, l, m, w), t)
    }

    /// Constructs an empty index from the parameters.
    /// If `t` exceeds `3^m - 1`, returns Error::InvalidParameter, and if the
    /// search for that many sets runs past its guard, returns
    /// Error::ProbeSearchExhausted.
    pub fn with_params(params: &Params, t: usize) -> Result<Self> {
        let basic = BasicIndex::with_params(params)?;
        let probes = ProbeSequence::new(params.l, params.m, t, params.seed)?;
        Ok(Self { basic, probes })
    }

    /// Inserts `id` into every table under the key of `point`.
    pub fn insert<T: Scalar>(&self, point: &[T], id: I) -> Result<()> {
        self.basic.insert(point, id)
    }

    /// Finds the ids in the buckets of the base key and all the perturbed keys.
    pub fn query<T: Scalar>(&self, point: &[T]) -> Result<HashSet<I>> {
        self.query_with_probes(point, self.probes.len())
    }

    /// Same as [`MultiprobeIndex::query`] but using only the first `probes`
    /// perturbations. With `probes == 0` this equals a basic LSH query.
    pub fn query_with_probes<T: Scalar>(&self, point: &[T], probes: usize) -> Result<HashSet<I>> {
        if self.probes.len() < probes {
            return Err(Error::invalid(
                "probes",
                format!("must be at most t = {}, got {}", self.probes.len(), probes),
            ));
        }

        let base = self.basic.family().hash(point)?;
        let mut answers = HashSet::new();
        self.basic.lookup_keys(&base, &mut answers);
        for p in 0..probes {
            let keys = self.probes.perturb(p, &base);
            self.basic.lookup_keys(&keys, &mut answers);
        }
        Ok(answers)
    }

    /// Gets the number of perturbed probes per table.
    pub fn get_t(&self) -> usize {
        self.probes.len()
    }

    /// Gets the scores of the unit perturbation ranks `1..=2m`.
    pub fn scores(&self) -> &[f64] {
        self.probes.scores()
    }

    pub fn perturb_sets(&self) -> &[PerturbSet] {
        self.probes.sets()
    }

    /// Gets the perturbation vector of the probe for the table,
    /// or None if either is out of range.
    pub fn perturb_vector(&self, probe: usize, table: usize) -> Option<&[i8]> {
        self.probes.vector(probe, table)
    }

    pub fn basic(&self) -> &BasicIndex<I> {
        &self.basic
    }
}
