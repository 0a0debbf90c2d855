//! Probing sequence of the Multi-probe LSH by Lv et al., built once per index.
//!
//! A perturbation set holds ranks in `1..=2m`. Rank `j <= m` means a `+1`
//! on the j-th unit perturbation and rank `j > m` means a `-1` on the
//! `(2m + 1 - j)`-th one. Sets are enumerated in ascending score with a
//! min-heap and mapped to per-table vectors through random permutations.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::hash::TableKey;

/// Set of unit perturbation ranks, kept sorted in ascending order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PerturbSet(Vec<usize>);

impl PerturbSet {
    pub fn ranks(&self) -> &[usize] {
        &self.0
    }

    /// Checks that no coordinate is perturbed in both directions
    /// and no rank exceeds 2m.
    pub fn is_valid(&self, m: usize) -> bool {
        self.0
            .iter()
            .all(|&k| k <= 2 * m && !self.0.contains(&(2 * m + 1 - k)))
    }

    fn max(&self) -> usize {
        self.0.last().copied().unwrap_or(0)
    }

    /// Replaces the maximum rank `x` with `x + 1`.
    fn shift(&self) -> Self {
        let mut next = self.0.clone();
        if let Some(x) = next.last_mut() {
            *x += 1;
        }
        Self(next)
    }

    /// Adds the rank `max + 1`.
    fn expand(&self) -> Self {
        let mut next = self.0.clone();
        next.push(self.max() + 1);
        Self(next)
    }
}

struct Candidate {
    score: f64,
    set: PerturbSet,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Reversed so that BinaryHeap pops the lowest score first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.set.0.cmp(&self.set.0))
    }
}

/// The `t` perturbation sets of lowest scores and their vectors for every table.
#[derive(Clone, Debug)]
pub struct ProbeSequence {
    l: usize,
    m: usize,
    scores: Vec<f64>,
    sets: Vec<PerturbSet>,
    // [probe][table][coordinate]
    vectors: Vec<i8>,
}

impl ProbeSequence {
    /// Generates the sequence of `t` probes for `l` tables of `m` hash values.
    /// The permutation of table `i` is drawn from `seed + i`.
    /// If `t` exceeds the number of valid sets `3^m - 1`, returns
    /// Error::InvalidParameter. If the search for valid sets runs past its
    /// guard, returns Error::ProbeSearchExhausted.
    pub fn new(l: usize, m: usize, t: usize, seed: u64) -> Result<Self> {
        if m == 0 {
            return Err(Error::invalid("m", "must not be zero"));
        }
        if let Some(max) = max_sets(m) {
            if max < t {
                return Err(Error::invalid(
                    "t",
                    format!("must be at most 3^m - 1 = {} for m = {}, got {}", max, m, t),
                ));
            }
        }

        let scores = unit_scores(m);
        let sets = gen_perturb_sets(&scores, m, t)?;
        let vectors = gen_perturb_vecs(&sets, l, m, seed);

        tracing::debug!(l, m, t, "generated probing sequence");

        Ok(Self {
            l,
            m,
            scores,
            sets,
            vectors,
        })
    }

    /// Gets the number of probes, excluding the base key.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Gets the scores of ranks `1..=2m`, at positions `0..2m`.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn score(&self, set: &PerturbSet) -> f64 {
        set_score(&self.scores, set)
    }

    pub fn sets(&self) -> &[PerturbSet] {
        &self.sets
    }

    /// Gets the perturbation vector of the probe for the table,
    /// or None if either is out of range.
    pub fn vector(&self, probe: usize, table: usize) -> Option<&[i8]> {
        if self.len() <= probe || self.l <= table {
            return None;
        }
        Some(self.slot(probe, table))
    }

    /// Applies the perturbation vectors of the probe to the base keys of all tables.
    /// Hash values at the ends of the `i64` range saturate.
    ///
    /// # Panics
    ///
    /// Panics if `probe` is not less than [`ProbeSequence::len`].
    pub fn perturb(&self, probe: usize, base: &[TableKey]) -> Vec<TableKey> {
        debug_assert_eq!(base.len(), self.l);
        base.iter()
            .enumerate()
            .map(|(table, key)| {
                key.iter()
                    .zip(self.slot(probe, table))
                    .map(|(&hv, &d)| hv.saturating_add(d as i64))
                    .collect()
            })
            .collect()
    }

    fn slot(&self, probe: usize, table: usize) -> &[i8] {
        let beg = (probe * self.l + table) * self.m;
        &self.vectors[beg..beg + self.m]
    }
}

/// Number of valid perturbation sets, `3^m - 1`, or None if it overflows.
fn max_sets(m: usize) -> Option<usize> {
    let m = u32::try_from(m).ok()?;
    3usize.checked_pow(m).map(|n| n - 1)
}

/// Scores approximating the rank of each unit perturbation by its
/// expected squared distance to the slot boundary.
fn unit_scores(m: usize) -> Vec<f64> {
    let denom = (4 * (m + 1) * (m + 2)) as f64;
    let mut scores = vec![0.0; 2 * m];
    for j in 1..=m {
        scores[j - 1] = (j * (j + 1)) as f64 / denom;
    }
    for j in m + 1..=2 * m {
        let r = 2 * m + 1 - j;
        scores[j - 1] = 1.0 - r as f64 / (m + 1) as f64 + (r * (r + 1)) as f64 / denom;
    }
    scores
}

fn set_score(scores: &[f64], set: &PerturbSet) -> f64 {
    // Ranks beyond 2m belong to invalid sets and only order the heap.
    set.0
        .iter()
        .map(|&k| scores.get(k - 1).copied().unwrap_or(1.0))
        .sum()
}

fn gen_perturb_sets(scores: &[f64], m: usize, t: usize) -> Result<Vec<PerturbSet>> {
    let candidate = |set: PerturbSet| Candidate {
        score: set_score(scores, &set),
        set,
    };

    let mut heap = BinaryHeap::new();
    heap.push(candidate(PerturbSet(vec![1])));

    let mut sets = Vec::new();
    for probe in 0..t {
        let mut counter = 0;
        loop {
            let top = match heap.pop() {
                Some(top) => top,
                None => {
                    return Err(Error::ProbeSearchExhausted {
                        probe,
                        iterations: counter,
                        m,
                        t,
                    })
                }
            };
            heap.push(candidate(top.set.shift()));
            heap.push(candidate(top.set.expand()));

            if top.set.is_valid(m) {
                tracing::trace!(probe, score = top.score, ranks = ?top.set.0, "accepted perturbation set");
                sets.push(top.set);
                break;
            }
            if 2 * m <= counter {
                return Err(Error::ProbeSearchExhausted {
                    probe,
                    iterations: counter + 1,
                    m,
                    t,
                });
            }
            counter += 1;
        }
    }
    Ok(sets)
}

fn gen_perturb_vecs(sets: &[PerturbSet], l: usize, m: usize, seed: u64) -> Vec<i8> {
    // perms[i][j] maps rank j + 1 of table i to a coordinate;
    // ranks above m use the mirrored rank.
    let perms: Vec<Vec<usize>> = (0..l)
        .map(|i| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
            let mut perm: Vec<usize> = (0..m).collect();
            perm.shuffle(&mut rng);
            perm
        })
        .collect();

    let mut vectors = vec![0i8; sets.len() * l * m];
    for (p, set) in sets.iter().enumerate() {
        for (i, perm) in perms.iter().enumerate() {
            let vec = &mut vectors[(p * l + i) * m..(p * l + i + 1) * m];
            for &k in set.ranks() {
                if k <= m {
                    vec[perm[k - 1]] = 1;
                } else {
                    vec[perm[2 * m - k]] = -1;
                }
            }
        }
    }
    vectors
}
