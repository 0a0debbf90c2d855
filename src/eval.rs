//! Evaluation helpers for experiments: re-ranking of candidates, a parallel
//! query runner, and the recall and error ratio of approximate results.

use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::ls::Neighbour;
use crate::{l2, Scalar};

/// Result of one query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    pub query_id: u32,
    pub neighbours: Vec<Neighbour>,
    pub elapsed_ms: f64,
}

/// Runs search and records its elapsed time.
pub fn timed<F>(query_id: u32, search: F) -> QueryResult
where
    F: FnOnce() -> Vec<Neighbour>,
{
    let ins = Instant::now();
    let neighbours = search();
    let elapsed_ms = ins.elapsed().as_secs_f64() * 1e3;
    QueryResult {
        query_id,
        neighbours,
        elapsed_ms,
    }
}

/// Same as [`timed`] for a search that can fail.
pub fn try_timed<F>(query_id: u32, search: F) -> Result<QueryResult>
where
    F: FnOnce() -> Result<Vec<Neighbour>>,
{
    let ins = Instant::now();
    let neighbours = search()?;
    let elapsed_ms = ins.elapsed().as_secs_f64() * 1e3;
    Ok(QueryResult {
        query_id,
        neighbours,
        elapsed_ms,
    })
}

/// Runs the queries in parallel on the rayon thread pool.
/// Returns the results sorted by query id.
pub fn parallel_query<Q, F>(queries: &[Q], run: F) -> Vec<QueryResult>
where
    Q: Sync,
    F: Fn(&Q) -> QueryResult + Sync + Send,
{
    let mut results: Vec<QueryResult> = queries.par_iter().map(run).collect();
    results.sort_by_key(|r| r.query_id);
    results
}

/// Same as [`parallel_query`], stopping at the first failed query.
pub fn try_parallel_query<Q, F>(queries: &[Q], run: F) -> Result<Vec<QueryResult>>
where
    Q: Sync,
    F: Fn(&Q) -> Result<QueryResult> + Sync + Send,
{
    let mut results: Vec<QueryResult> = queries.par_iter().map(run).collect::<Result<_>>()?;
    results.sort_by_key(|r| r.query_id);
    Ok(results)
}

/// Computes the true distances of candidates (positions in points) to query,
/// and keeps the k closest in ascending order.
pub fn rerank<T, P, C>(points: &[P], query: &[T], candidates: C, k: usize) -> Vec<Neighbour>
where
    T: Scalar,
    P: AsRef<[T]>,
    C: IntoIterator<Item = u32>,
{
    let mut neighbours: Vec<Neighbour> = candidates
        .into_iter()
        .filter_map(|id| {
            points
                .get(id as usize)
                .map(|p| Neighbour::new(id, l2(p.as_ref(), query)))
        })
        .collect();
    neighbours.sort();
    neighbours.truncate(k);
    neighbours
}

/// Fraction of the ground truth found in the approximate result.
/// An empty ground truth has the recall 1.
pub fn recall(ann: &[Neighbour], truth: &[Neighbour]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let found = truth
        .iter()
        .filter(|t| ann.iter().any(|a| a.id == t.id))
        .count();
    found as f64 / truth.len() as f64
}

/// Mean ratio of the i-th approximate distance to the i-th true distance.
/// A zero true distance counts as the ratio 1. Returns None if the
/// approximate result has fewer neighbours than the ground truth or the
/// ground truth is empty.
pub fn error_ratio(ann: &[Neighbour], truth: &[Neighbour]) -> Option<f64> {
    if truth.is_empty() || ann.len() < truth.len() {
        return None;
    }
    let mut ann = ann.to_vec();
    let mut truth = truth.to_vec();
    ann.sort();
    truth.sort();

    let sum: f64 = truth
        .iter()
        .zip(ann.iter())
        .map(|(t, a)| {
            if t.distance == 0.0 {
                1.0
            } else {
                a.distance / t.distance
            }
        })
        .sum();
    Some(sum / truth.len() as f64)
}

/// Per-query quality of an experiment, sorted by query id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Analysis {
    pub query_ids: Vec<u32>,
    pub recalls: Vec<f64>,
    pub error_ratios: Vec<Option<f64>>,
    pub times: Vec<f64>,
}

impl Analysis {
    pub fn mean_recall(&self) -> f64 {
        mean(self.recalls.iter().copied())
    }

    /// Mean over the queries having an error ratio.
    pub fn mean_error_ratio(&self) -> f64 {
        mean(self.error_ratios.iter().flatten().copied())
    }

    pub fn mean_time(&self) -> f64 {
        mean(self.times.iter().copied())
    }
}

/// Compares the results with the ground truth of the same queries.
/// If a query has no ground truth, returns Error::InvalidParameter.
pub fn analyze(results: &[QueryResult], truth: &[QueryResult]) -> Result<Analysis> {
    let truth: HashMap<u32, &QueryResult> = truth.iter().map(|t| (t.query_id, t)).collect();

    let mut results: Vec<&QueryResult> = results.iter().collect();
    results.sort_by_key(|r| r.query_id);

    let mut analysis = Analysis::default();
    for r in results {
        let gt = truth.get(&r.query_id).ok_or_else(|| {
            Error::invalid("truth", format!("no ground truth for query {}", r.query_id))
        })?;
        analysis.query_ids.push(r.query_id);
        analysis.recalls.push(recall(&r.neighbours, &gt.neighbours));
        analysis
            .error_ratios
            .push(error_ratio(&r.neighbours, &gt.neighbours));
        analysis.times.push(r.elapsed_ms);
    }
    Ok(analysis)
}

fn mean<It: Iterator<Item = f64>>(values: It) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
