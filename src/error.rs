use thiserror::Error;

/// Errors raised by index construction and point handling.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("dimension mismatch: index expects {expected} dimensions, point has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The perturbation-set search ran past its iteration guard,
    /// i.e., m is too small for the requested number of probes.
    #[error(
        "perturbation search exhausted after {iterations} iterations at probe {probe} (m = {m}, t = {t})"
    )]
    ProbeSearchExhausted {
        probe: usize,
        iterations: usize,
        m: usize,
        t: usize,
    },

    #[error("malformed point record: expected {expected} bytes, got {actual}")]
    MalformedRecord { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
