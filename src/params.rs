use crate::error::{Error, Result};

/// Seed used when none is given, so that indexes built with the same
/// `(dim, l, m, w)` hash identically.
pub const DEFAULT_SEED: u64 = 1;

/// Parameters of the hash family shared by all the index variants.
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    /// Dimensionality of the points.
    pub dim: usize,
    /// Number of hash tables (or trees).
    pub l: usize,
    /// Number of hash functions concatenated into one table key.
    pub m: usize,
    /// Slot width of each hash function.
    pub w: f64,
    /// Seed of the projection vectors and offsets.
    pub seed: u64,
}

impl Params {
    pub fn new(dim: usize, l: usize, m: usize, w: f64) -> Self {
        Self {
            dim,
            l,
            m,
            w,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks the parameters.
    /// If invalid values are given, returns Error::InvalidParameter.
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(Error::invalid("dim", "must not be zero"));
        }
        if self.l == 0 {
            return Err(Error::invalid("l", "must not be zero"));
        }
        if self.m == 0 {
            return Err(Error::invalid("m", "must not be zero"));
        }
        if !self.w.is_finite() || self.w <= 0.0 {
            return Err(Error::invalid(
                "w",
                format!("must be a positive finite number, got {}", self.w),
            ));
        }
        Ok(())
    }
}
