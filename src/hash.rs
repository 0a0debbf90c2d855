//! The p-stable (Gaussian) hash family for the L2 distance.

use crate::error::{Error, Result};
use crate::params::Params;
use crate::{dot, Scalar};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Hash values of one point in one table, i.e., `m` slot numbers.
pub type TableKey = Vec<i64>;

/// Random projections and offsets of `l x m` hash functions
/// `h(x) = floor((a . x + b) / w)`.
#[derive(Clone, Debug)]
pub struct HashFamily {
    params: Params,
    // [table][func][dim]
    a: Vec<f64>,
    // [table][func]
    b: Vec<f64>,
}

impl HashFamily {
    /// Draws the hash functions from the seed in `params`.
    /// If invalid parameters are given, returns Error::InvalidParameter.
    pub fn new(params: &Params) -> Result<Self> {
        params.validate()?;

        let Params { dim, l, m, w, seed } = *params;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut a = Vec::with_capacity(l * m * dim);
        let mut b = Vec::with_capacity(l * m);
        for _ in 0..l * m {
            for _ in 0..dim {
                a.push(rng.sample::<f64, _>(StandardNormal));
            }
            b.push(rng.gen::<f64>() * w);
        }

        tracing::debug!(dim, l, m, w, seed, "built hash family");

        Ok(Self {
            params: params.clone(),
            a,
            b,
        })
    }

    /// Computes the keys of `point` for all the tables.
    pub fn hash<T: Scalar>(&self, point: &[T]) -> Result<Vec<TableKey>> {
        self.check_dim(point)?;
        Ok((0..self.l()).map(|t| self.key_of(t, point)).collect())
    }

    /// Computes the key of `point` for the given table.
    pub fn hash_table<T: Scalar>(&self, table: usize, point: &[T]) -> Result<TableKey> {
        self.check_dim(point)?;
        if self.l() <= table {
            return Err(Error::invalid(
                "table",
                format!("must be less than l = {}, got {}", self.l(), table),
            ));
        }
        Ok(self.key_of(table, point))
    }

    pub fn check_dim<T>(&self, point: &[T]) -> Result<()> {
        if point.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                actual: point.len(),
            });
        }
        Ok(())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn dim(&self) -> usize {
        self.params.dim
    }

    pub fn l(&self) -> usize {
        self.params.l
    }

    pub fn m(&self) -> usize {
        self.params.m
    }

    pub fn w(&self) -> f64 {
        self.params.w
    }

    pub fn seed(&self) -> u64 {
        self.params.seed
    }

    fn key_of<T: Scalar>(&self, table: usize, point: &[T]) -> TableKey {
        let (dim, m, w) = (self.dim(), self.m(), self.w());
        (0..m)
            .map(|j| {
                let f = table * m + j;
                let proj = &self.a[f * dim..(f + 1) * dim];
                ((dot(point, proj) + self.b[f]) / w).floor() as i64
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn random_point(rng: &mut ChaCha8Rng, dim: usize) -> Vec<f64> {
        (0..dim).map(|_| rng.gen_range(-32.0..32.0)).collect()
    }

    #[test]
    fn shapes_match_params() {
        let family = HashFamily::new(&Params::new(10, 3, 4, 2.0)).unwrap();
        assert_eq!(family.a.len(), 3 * 4 * 10);
        assert_eq!(family.b.len(), 3 * 4);
        assert!(family.b.iter().all(|&b| (0.0..2.0).contains(&b)));

        let keys = family.hash(&vec![0.5f64; 10]).unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|k| k.len() == 4));
    }

    #[test]
    fn same_seed_hashes_identically() {
        let params = Params::new(100, 5, 5, 5.0);
        let f1 = HashFamily::new(&params).unwrap();
        let f2 = HashFamily::new(&params).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..50 {
            let p = random_point(&mut rng, 100);
            assert_eq!(f1.hash(&p).unwrap(), f2.hash(&p).unwrap());
        }
    }

    #[test]
    fn different_seeds_draw_different_functions() {
        let f1 = HashFamily::new(&Params::new(16, 2, 2, 1.0)).unwrap();
        let f2 = HashFamily::new(&Params::new(16, 2, 2, 1.0).with_seed(2)).unwrap();
        assert_ne!(f1.a, f2.a);
    }

    #[test]
    fn hash_table_agrees_with_hash() {
        let family = HashFamily::new(&Params::new(8, 4, 3, 1.5)).unwrap();
        let p = vec![1.0f32, -2.0, 3.0, 0.0, 4.5, -1.25, 7.0, 2.0];
        let keys = family.hash(&p).unwrap();
        for (t, key) in keys.iter().enumerate() {
            assert_eq!(&family.hash_table(t, &p).unwrap(), key);
        }
        assert!(family.hash_table(4, &p).is_err());
    }

    #[test]
    fn hash_follows_formula() {
        let family = HashFamily::new(&Params::new(3, 1, 2, 0.5)).unwrap();
        let p = [1.0f64, 2.0, -3.0];
        let keys = family.hash(&p).unwrap();
        for j in 0..2 {
            let a = &family.a[j * 3..(j + 1) * 3];
            let expected = ((p[0] * a[0] + p[1] * a[1] + p[2] * a[2] + family.b[j]) / 0.5).floor();
            assert_eq!(keys[0][j], expected as i64);
        }
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let family = HashFamily::new(&Params::new(4, 2, 2, 1.0)).unwrap();
        match family.hash(&[1.0f64, 2.0]) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(HashFamily::new(&Params::new(4, 2, 2, 0.0)).is_err());
        assert!(HashFamily::new(&Params::new(0, 2, 2, 1.0)).is_err());
    }
}
