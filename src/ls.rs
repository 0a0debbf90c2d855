//! Implements a simple exhaustive search algorithm for comparison with LSH.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::{l2, Scalar};

/// Id of a data point and its distance to a query.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Neighbour {
    pub id: u32,
    pub distance: f64,
}

impl Neighbour {
    pub fn new(id: u32, distance: f64) -> Self {
        Self { id, distance }
    }
}

impl Eq for Neighbour {}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Finds the k points closest to query, where the id of a point is its position.
/// Returns the neighbours sorted by ascending distance.
pub fn knn_search<T, P>(points: &[P], query: &[T], k: usize) -> Vec<Neighbour>
where
    T: Scalar,
    P: AsRef<[T]>,
{
    if k == 0 {
        return Vec::new();
    }

    // Max-heap of the k closest so far; the top is the farthest of them.
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (i, p) in points.iter().enumerate() {
        let cand = Neighbour::new(i as u32, l2(p.as_ref(), query));
        if heap.len() < k {
            heap.push(cand);
        } else if let Some(top) = heap.peek() {
            if cand < *top {
                heap.pop();
                heap.push(cand);
            }
        }
    }
    heap.into_sorted_vec()
}

/// Computes all the distances between points and query.
/// Returns the neighbours in the order of points.
pub fn exhaustive_search<T, P>(points: &[P], query: &[T]) -> Vec<Neighbour>
where
    T: Scalar,
    P: AsRef<[T]>,
{
    let mut answers = Vec::new();
    exhaustive_search_with_buf(points, query, &mut answers);
    answers
}

/// Computes all the distances between points and query.
/// The neighbours are stored in answers.
pub fn exhaustive_search_with_buf<T, P>(points: &[P], query: &[T], answers: &mut Vec<Neighbour>)
where
    T: Scalar,
    P: AsRef<[T]>,
{
    answers.clear();
    answers.extend(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| Neighbour::new(i as u32, l2(p.as_ref(), query))),
    );
}
