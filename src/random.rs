use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use thiserror::Error;

/// Errors raised by the random draw contract.
#[derive(Debug, Error, PartialEq)]
pub enum RandomError {
    #[error("uniform: invalid range [{low}, {high}]")]
    InvalidRange { low: f64, high: f64 },
    #[error("normal: invalid variance {0}")]
    InvalidVariance(f64),
}

/// Source of random draws consumed by the engine.
///
/// Implementors only provide the two primitive draws and seeding; the range-checked
/// `uniform` and `normal` draws are built on top of them.
pub trait RandomSource {
    /// Uniform draw on [0, 1).
    fn unit(&mut self) -> f64;

    /// Standard normal draw (mean 0, variance 1).
    fn standard_normal(&mut self) -> f64;

    fn set_seed(&mut self, seed: u64);

    /// Uniform draw on [low, high). A degenerate range returns `low` without drawing.
    fn uniform(&mut self, low: f64, high: f64) -> Result<f64, RandomError> {
        if low > high || low.is_nan() || high.is_nan() {
            return Err(RandomError::InvalidRange { low, high });
        }
        if low == high {
            return Ok(low);
        }
        Ok(low + (high - low) * self.unit())
    }

    /// Normal draw parameterized by mean and variance.
    fn normal(&mut self, mean: f64, variance: f64) -> Result<f64, RandomError> {
        if variance < 0.0 || variance.is_nan() {
            return Err(RandomError::InvalidVariance(variance));
        }
        Ok(mean + variance.sqrt() * self.standard_normal())
    }
}

/// Reproducible random source backed by `StdRng`.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        SeededRandom { rng: StdRng::seed_from_u64(seed) }
    }
}

impl RandomSource for SeededRandom {
    fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

/// Wraps a random source and counts the primitive draws taken from it.
#[derive(Debug, Clone)]
pub struct CountingRandom<R> {
    inner: R,
    draws: u64,
}

impl<R: RandomSource> CountingRandom<R> {
    pub fn new(inner: R) -> Self {
        CountingRandom { inner, draws: 0 }
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn reset(&mut self) {
        self.draws = 0;
    }
}

impl<R: RandomSource> RandomSource for CountingRandom<R> {
    fn unit(&mut self) -> f64 {
        self.draws += 1;
        self.inner.unit()
    }

    fn standard_normal(&mut self) -> f64 {
        self.draws += 1;
        self.inner.standard_normal()
    }

    fn set_seed(&mut self, seed: u64) {
        self.inner.set_seed(seed);
    }
}
