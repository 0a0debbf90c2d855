use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::error::Result;
use crate::hash::{HashFamily, TableKey};
use crate::index::trie::Tree;
use crate::index::Id;
use crate::params::Params;
use crate::Scalar;

/// LSH Forest: `l` prefix trees of depth `m` over the table keys.
///
/// A lookup at level `d` matches only the first `d` hash values of a key,
/// so lowering the level widens the candidates. [`ForestIndex::query_top_k`]
/// relaxes the level until enough candidates are found.
pub struct ForestIndex<I> {
    family: HashFamily,
    trees: Vec<RwLock<Tree<I>>>,
}

impl<I: Id> ForestIndex<I> {
    /// Constructs an empty forest with the default seed.
    pub fn new(dim: usize, l: usize, m: usize, w: f64) -> Result<Self> {
        Self::with_params(&Params::new(dim, l, m, w))
    }

    /// Constructs an empty forest from the parameters.
    /// If invalid inputs are given, returns Error::InvalidParameter.
    pub fn with_params(params: &Params) -> Result<Self> {
        let family = HashFamily::new(params)?;
        let trees = (0..params.l).map(|_| RwLock::default()).collect();
        Ok(Self { family, trees })
    }

    /// Inserts `id` into every tree along the key of `point`.
    /// Returns after all the trees are updated.
    pub fn insert<T: Scalar>(&self, point: &[T], id: I) -> Result<()> {
        let keys = self.family.hash(point)?;
        self.trees
            .par_iter()
            .zip(keys.par_iter())
            .for_each(|(tree, key)| tree.write().insert(key, id.clone()));
        Ok(())
    }

    /// Finds the ids whose keys fully match the key of `point` in at least one tree.
    pub fn query<T: Scalar>(&self, point: &[T]) -> Result<HashSet<I>> {
        self.query_at_level(point, self.family.m())
    }

    /// Finds the ids sharing the first `level` hash values with `point`
    /// in at least one tree.
    pub fn query_at_level<T: Scalar>(&self, point: &[T], level: usize) -> Result<HashSet<I>> {
        let keys = self.family.hash(point)?;
        Ok(self.collect(level, &keys))
    }

    /// Finds at least `k` candidates if possible, lowering the level from
    /// `m` towards 0 until the union of the lookups reaches `k` ids.
    /// Returns the union at the last level, which can have fewer or more
    /// than `k` ids.
    pub fn query_top_k<T: Scalar>(&self, point: &[T], k: usize) -> Result<HashSet<I>> {
        let keys = self.family.hash(point)?;
        let mut answers = HashSet::new();
        for level in (0..=self.family.m()).rev() {
            answers = self.collect(level, &keys);
            if k <= answers.len() {
                tracing::trace!(level, found = answers.len(), "top-k query satisfied");
                break;
            }
        }
        Ok(answers)
    }

    /// Streams the ids of a lookup at `level`, with one producer thread per
    /// tree feeding a bounded channel. `visit` is called on the calling
    /// thread for each received id (ids found in several trees are
    /// received several times); returning `ControlFlow::Break` cancels the
    /// producers, each of which emits at most one more id.
    ///
    /// `visit` must not write to this index, because the producers hold
    /// the read locks of the trees until they finish.
    pub fn stream<T, F>(&self, point: &[T], level: usize, mut visit: F) -> Result<()>
    where
        T: Scalar,
        F: FnMut(I) -> ControlFlow<()>,
    {
        let keys = self.family.hash(point)?;
        let done = AtomicBool::new(false);
        let (tx, rx) = crossbeam_channel::bounded(self.trees.len());

        thread::scope(|s| {
            for (tree, key) in self.trees.iter().zip(keys.iter()) {
                let tx = tx.clone();
                let done = &done;
                s.spawn(move || {
                    tree.read().visit(level, key, |id| {
                        !done.load(Ordering::Acquire) && tx.send(id.clone()).is_ok()
                    });
                });
            }
            drop(tx);

            for id in rx.iter() {
                if visit(id).is_break() {
                    done.store(true, Ordering::Release);
                    break;
                }
            }
            // Wakes up the producers blocked on a full channel.
            drop(rx);
        });

        Ok(())
    }

    /// Collects distinct ids of a lookup at `level` through
    /// [`ForestIndex::stream`], cancelling once `limit` ids are found.
    pub fn query_until<T: Scalar>(
        &self,
        point: &[T],
        level: usize,
        limit: usize,
    ) -> Result<HashSet<I>> {
        let mut answers = HashSet::new();
        if limit == 0 {
            self.family.check_dim(point)?;
            return Ok(answers);
        }
        self.stream(point, level, |id| {
            answers.insert(id);
            if limit <= answers.len() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        Ok(answers)
    }

    /// Removes all the occurrences of `id` from every tree.
    pub fn delete(&self, id: &I) {
        let removed: usize = self
            .trees
            .par_iter()
            .map(|tree| tree.write().remove(id))
            .sum();
        tracing::debug!(removed, "deleted id from forest index");
    }

    /// Releases all the nodes of every tree.
    pub fn clear(&self) {
        self.trees.par_iter().for_each(|tree| tree.write().clear());
    }

    /// Gets, for each tree, the number of inserts that created a new path.
    pub fn path_counts(&self) -> Vec<usize> {
        self.trees.iter().map(|t| t.read().get_paths()).collect()
    }

    /// Gets the number of nodes, including the root, of each tree.
    pub fn node_counts(&self) -> Vec<usize> {
        self.trees.iter().map(|t| t.read().num_nodes()).collect()
    }

    pub fn family(&self) -> &HashFamily {
        &self.family
    }

    fn collect(&self, level: usize, keys: &[TableKey]) -> HashSet<I> {
        let hits: Vec<Vec<I>> = self
            .trees
            .par_iter()
            .zip(keys.par_iter())
            .map(|(tree, key)| tree.read().lookup(level, key))
            .collect();

        let mut answers = HashSet::new();
        for ids in hits {
            answers.extend(ids);
        }
        answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn random_points(n: usize, dim: usize, max: f64) -> Vec<Vec<f64>> {
        let mut rng = ChaCha8Rng::seed_from_u64(n as u64 * 17 + dim as u64);
        (0..n)
            .map(|_| (0..dim).map(|_| rng.gen_range(0.0..max)).collect())
            .collect()
    }

    fn build(points: &[Vec<f64>]) -> ForestIndex<String> {
        let index = ForestIndex::new(100, 5, 5, 5.0).unwrap();
        for (i, p) in points.iter().enumerate() {
            index.insert(p, i.to_string()).unwrap();
        }
        index
    }

    #[test]
    fn insert_creates_paths() {
        let points = random_points(10, 100, 32.0);
        let index = build(&points);
        assert_eq!(index.path_counts().len(), 5);
        assert!(index.path_counts().iter().all(|&c| 0 < c && c <= 10));
    }

    #[test]
    fn query_finds_inserted_points() {
        let points = random_points(10, 100, 32.0);
        let index = build(&points);
        for (i, p) in points.iter().enumerate() {
            assert!(index.query(p).unwrap().contains(&i.to_string()));
        }
    }

    #[test]
    fn query_top_k_relaxes_to_everything() {
        let points = random_points(10, 100, 32.0);
        let index = build(&points);
        let answers = index.query_top_k(&points[0], 10).unwrap();
        for i in 0..10 {
            assert!(answers.contains(&i.to_string()));
        }
    }

    #[test]
    fn shallower_levels_are_supersets() {
        let points = random_points(50, 100, 32.0);
        let index = build(&points);
        for p in points.iter().take(10) {
            for level in 1..=5 {
                let deep = index.query_at_level(p, level).unwrap();
                let shallow = index.query_at_level(p, level - 1).unwrap();
                assert!(deep.is_subset(&shallow));
            }
            assert_eq!(index.query_at_level(p, 0).unwrap().len(), 50);
        }
    }

    #[test]
    fn stream_matches_query() {
        let points = random_points(30, 100, 32.0);
        let index = build(&points);
        for p in &points {
            for level in [0, 2, 5] {
                let mut streamed = HashSet::new();
                index
                    .stream(p, level, |id| {
                        streamed.insert(id);
                        ControlFlow::Continue(())
                    })
                    .unwrap();
                assert_eq!(streamed, index.query_at_level(p, level).unwrap());
            }
        }
    }

    #[test]
    fn stream_can_be_cancelled() {
        let points = random_points(200, 100, 32.0);
        let index = build(&points);

        let mut received = 0;
        index
            .stream(&points[0], 0, |_| {
                received += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(received, 1);

        let answers = index.query_until(&points[0], 0, 7).unwrap();
        assert_eq!(answers.len(), 7);
        let answers = index.query_until(&points[0], 0, 1000).unwrap();
        assert_eq!(answers.len(), 200);
        assert!(index.query_until(&points[0], 0, 0).unwrap().is_empty());
    }

    /// Id counting its clones; the producers clone once per send attempt.
    #[derive(Debug)]
    struct Counted {
        id: usize,
        clones: Arc<AtomicUsize>,
    }

    impl Clone for Counted {
        fn clone(&self) -> Self {
            self.clones.fetch_add(1, Ordering::SeqCst);
            Self {
                id: self.id,
                clones: Arc::clone(&self.clones),
            }
        }
    }

    impl PartialEq for Counted {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Eq for Counted {}

    impl std::hash::Hash for Counted {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    #[test]
    fn cancelled_producers_send_at_most_once_more() {
        let (l, n) = (5, 500);
        let points = random_points(n, 100, 32.0);
        let clones = Arc::new(AtomicUsize::new(0));
        let index = ForestIndex::new(100, l, 5, 5.0).unwrap();
        for (id, p) in points.iter().enumerate() {
            let id = Counted {
                id,
                clones: Arc::clone(&clones),
            };
            index.insert(p, id).unwrap();
        }

        for _ in 0..20 {
            clones.store(0, Ordering::SeqCst);
            let mut received = 0;
            index
                .stream(&points[0], 0, |_| {
                    received += 1;
                    ControlFlow::Break(())
                })
                .unwrap();
            assert_eq!(received, 1);
            // One received id, at most l buffered in the channel, and at
            // most one more attempt per producer after cancellation.
            let sends = clones.load(Ordering::SeqCst);
            assert!(1 <= sends && sends <= 1 + 2 * l, "{} sends", sends);
        }
    }

    #[test]
    fn delete_removes_only_the_given_id() {
        let points = random_points(10, 100, 32.0);
        let index = build(&points);
        index.delete(&"3".to_string());
        assert!(!index.query(&points[3]).unwrap().contains("3"));
        assert!(!index.query_top_k(&points[3], 100).unwrap().contains("3"));
        for (i, p) in points.iter().enumerate().filter(|(i, _)| *i != 3) {
            assert!(index.query(p).unwrap().contains(&i.to_string()));
        }
        assert_eq!(index.query_at_level(&points[0], 0).unwrap().len(), 9);
    }

    #[test]
    fn clear_releases_everything() {
        let points = random_points(10, 100, 32.0);
        let index = build(&points);
        assert!(index.node_counts().iter().all(|&n| 5 < n));
        index.clear();
        assert_eq!(index.path_counts(), vec![0; 5]);
        assert_eq!(index.node_counts(), vec![1; 5]);
        assert!(index.query_at_level(&points[0], 0).unwrap().is_empty());
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let index = ForestIndex::<u32>::new(3, 2, 2, 1.0).unwrap();
        assert!(matches!(
            index.query_top_k(&[1.0f64], 3),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.query_until(&[1.0f64], 0, 0),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.stream(&[1.0f64], 0, |_| ControlFlow::Continue(())),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
