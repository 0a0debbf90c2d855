//! Provides the benchmark of top-K search for LSH and LinearSearch algorithms.
use anyhow::{ensure, Result};
use e2lsh_rs::eval::{self, QueryResult};
use e2lsh_rs::{ls, BasicIndex, ForestIndex, MultiprobeIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time;
use tracing_subscriber::EnvFilter;

const DIM: usize = 64;
const SIZES: [usize; 3] = [1_000, 10_000, 100_000];
const TOPKS: [usize; 3] = [1, 10, 100];
const NUM_QUERIES: usize = 100;

const L: usize = 8;
const M: usize = 6;
const W: f64 = 4.0;
const T: usize = 16;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    #[cfg(debug_assertions)]
    println!("Debugging enabled");

    let points = gen_random_points(SIZES[SIZES.len() - 1], DIM, 1);
    let queries: Vec<(u32, Vec<f32>)> = gen_random_points(NUM_QUERIES, DIM, 2)
        .into_iter()
        .enumerate()
        .map(|(i, q)| (i as u32, q))
        .collect();

    for &size in &SIZES {
        println!("-- N={} --", size);
        perf_test(&points[0..size], &queries)?;
    }
    Ok(())
}

fn perf_test(points: &[Vec<f32>], queries: &[(u32, Vec<f32>)]) -> Result<()> {
    let ins = time::Instant::now();
    let basic = BasicIndex::new(DIM, L, M, W)?;
    let forest = ForestIndex::new(DIM, L, M, W)?;
    let multi = MultiprobeIndex::new(DIM, L, M, W, T)?;
    for (id, p) in points.iter().enumerate() {
        basic.insert(p, id as u32)?;
        forest.insert(p, id as u32)?;
        multi.insert(p, id as u32)?;
    }
    println!("Constr time: {} sec", ins.elapsed().as_secs_f64());

    for &topk in &TOPKS {
        let truth = eval::parallel_query(queries, |(id, q)| {
            eval::timed(*id, || ls::knn_search(points, q, topk))
        });
        report("LinearSearch", topk, &truth, &truth)?;

        let results = eval::try_parallel_query(queries, |(id, q)| {
            eval::try_timed(*id, || Ok(eval::rerank(points, q, basic.query(q)?, topk)))
        })?;
        report("BasicLSH", topk, &results, &truth)?;

        let results = eval::try_parallel_query(queries, |(id, q)| {
            eval::try_timed(*id, || {
                let cands = forest.query_top_k(q, topk)?;
                Ok(eval::rerank(points, q, cands, topk))
            })
        })?;
        report("LSHForest", topk, &results, &truth)?;

        let results = eval::try_parallel_query(queries, |(id, q)| {
            eval::try_timed(*id, || Ok(eval::rerank(points, q, multi.query(q)?, topk)))
        })?;
        report("MultiprobeLSH", topk, &results, &truth)?;
    }
    Ok(())
}

fn report(name: &str, topk: usize, results: &[QueryResult], truth: &[QueryResult]) -> Result<()> {
    ensure!(results.len() == truth.len(), "{} lost queries", name);
    let analysis = eval::analyze(results, truth)?;
    println!(
        "{} (K={}):\t{:.3} ms/query\trecall {:.3}\terror ratio {:.3}",
        name,
        topk,
        analysis.mean_time(),
        analysis.mean_recall(),
        analysis.mean_error_ratio()
    );
    Ok(())
}

pub fn gen_random_points(size: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points: Vec<Vec<f32>> = Vec::with_capacity(size);
    for _ in 0..size {
        points.push((0..dim).map(|_| rng.gen_range(0.0..1.0)).collect());
    }
    points
}
