//! Random-variate providers for inter-arrival, service, down and repair times.
//!
//! The engine only ever calls [`Distribution::draw`]. A provider that is
//! misconfigured or exhausted answers `None`, and the stage that asked treats
//! that as "no event" rather than inventing a value.

use crate::error::DistributionError;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Source of time values consumed by stages and servers.
pub trait Distribution: Send {
    /// Draw the next value, or `None` if the distribution cannot produce one.
    fn draw(&mut self) -> Option<Duration>;

    /// Whether the distribution can currently produce values.
    fn is_valid(&self) -> bool {
        true
    }
}

impl<D: Distribution + ?Sized> Distribution for Box<D> {
    fn draw(&mut self) -> Option<Duration> {
        (**self).draw()
    }

    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }
}

/// Always returns the same value.
#[derive(Debug, Clone)]
pub struct Constant {
    value: Duration,
}

impl Constant {
    pub fn new(value: Duration) -> Self {
        Self { value }
    }
}

impl Distribution for Constant {
    fn draw(&mut self) -> Option<Duration> {
        Some(self.value)
    }
}

/// Exponentially distributed values with the given mean.
pub struct Exponential {
    mean: Duration,
    rng: ChaCha8Rng,
    exp_dist: rand_distr::Exp<f64>,
}

impl Exponential {
    pub fn new(mean: Duration, seed: u64) -> Result<Self, DistributionError> {
        let mean_secs = mean.as_secs_f64();
        if !(mean_secs > 0.0 && mean_secs.is_finite()) {
            return Err(DistributionError::InvalidMean(mean_secs));
        }
        let exp_dist =
            rand_distr::Exp::new(1.0 / mean_secs).map_err(|_| DistributionError::InvalidMean(mean_secs))?;

        Ok(Self {
            mean,
            rng: ChaCha8Rng::seed_from_u64(seed),
            exp_dist,
        })
    }

    pub fn mean(&self) -> Duration {
        self.mean
    }
}

impl Distribution for Exponential {
    fn draw(&mut self) -> Option<Duration> {
        let secs: f64 = self.rng.sample(self.exp_dist);
        Some(Duration::from_secs_f64(secs))
    }
}

/// Values drawn uniformly from `[min, max)`.
pub struct Uniform {
    rng: ChaCha8Rng,
    uniform_dist: rand::distributions::Uniform<f64>,
}

impl Uniform {
    pub fn new(min: Duration, max: Duration, seed: u64) -> Result<Self, DistributionError> {
        if min >= max {
            return Err(DistributionError::InvalidRange { min, max });
        }

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            uniform_dist: rand::distributions::Uniform::new(min.as_secs_f64(), max.as_secs_f64()),
        })
    }
}

impl Distribution for Uniform {
    fn draw(&mut self) -> Option<Duration> {
        let secs: f64 = self.rng.sample(self.uniform_dist);
        Some(Duration::from_secs_f64(secs))
    }
}

/// Triangular distribution, typically used for repair and outage windows.
pub struct Triangular {
    rng: ChaCha8Rng,
    tri_dist: rand_distr::Triangular<f64>,
}

impl Triangular {
    pub fn new(min: Duration, mode: Duration, max: Duration, seed: u64) -> Result<Self, DistributionError> {
        if !(min <= mode && mode <= max && min < max) {
            return Err(DistributionError::InvalidShape);
        }
        let tri_dist = rand_distr::Triangular::new(min.as_secs_f64(), max.as_secs_f64(), mode.as_secs_f64())
            .map_err(|_| DistributionError::InvalidShape)?;

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            tri_dist,
        })
    }
}

impl Distribution for Triangular {
    fn draw(&mut self) -> Option<Duration> {
        let secs: f64 = self.rng.sample(self.tri_dist);
        Some(Duration::from_secs_f64(secs))
    }
}

/// Replays a fixed list of values.
///
/// A cycling sequence wraps around forever. A one-shot sequence becomes
/// invalid once every value has been drawn.
#[derive(Debug, Clone)]
pub struct Sequence {
    values: Vec<Duration>,
    cursor: usize,
    cycle: bool,
}

impl Sequence {
    pub fn cycle(values: Vec<Duration>) -> Result<Self, DistributionError> {
        Self::build(values, true)
    }

    pub fn once(values: Vec<Duration>) -> Result<Self, DistributionError> {
        Self::build(values, false)
    }

    fn build(values: Vec<Duration>, cycle: bool) -> Result<Self, DistributionError> {
        if values.is_empty() {
            return Err(DistributionError::EmptySequence);
        }
        Ok(Self {
            values,
            cursor: 0,
            cycle,
        })
    }

    /// Number of values drawn so far.
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl Distribution for Sequence {
    fn draw(&mut self) -> Option<Duration> {
        if !self.is_valid() {
            return None;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        Some(value)
    }

    fn is_valid(&self) -> bool {
        self.cycle || self.cursor < self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let mut dist = Constant::new(Duration::from_secs(10));
        assert_eq!(dist.draw(), Some(Duration::from_secs(10)));
        assert_eq!(dist.draw(), Some(Duration::from_secs(10)));
        assert!(dist.is_valid());
    }

    #[test]
    fn test_exponential_rejects_zero_mean() {
        assert!(matches!(
            Exponential::new(Duration::ZERO, 1),
            Err(DistributionError::InvalidMean(_))
        ));
    }

    #[test]
    fn test_exponential_same_seed_same_stream() {
        let mut a = Exponential::new(Duration::from_secs(180), 42).unwrap();
        let mut b = Exponential::new(Duration::from_secs(180), 42).unwrap();
        for _ in 0..20 {
            assert_eq!(a.draw(), b.draw());
        }
    }

    #[test]
    fn test_exponential_sample_mean_is_close() {
        let mut dist = Exponential::new(Duration::from_secs(2), 7).unwrap();
        let n = 20_000;
        let total: f64 = (0..n).map(|_| dist.draw().unwrap().as_secs_f64()).sum();
        let mean = total / n as f64;
        assert!((mean - 2.0).abs() < 0.1, "sample mean {mean} too far from 2.0");
    }

    #[test]
    fn test_uniform_bounds() {
        let min = Duration::from_millis(50);
        let max = Duration::from_millis(150);
        let mut dist = Uniform::new(min, max, 3).unwrap();
        for _ in 0..100 {
            let value = dist.draw().unwrap();
            assert!(value >= min && value <= max);
        }
    }

    #[test]
    fn test_uniform_invalid_range() {
        let d = Duration::from_millis(100);
        assert_eq!(
            Uniform::new(d, d, 3).err(),
            Some(DistributionError::InvalidRange { min: d, max: d })
        );
    }

    #[test]
    fn test_triangular_bounds_and_shape() {
        let mut dist = Triangular::new(
            Duration::from_secs(300),
            Duration::from_secs(600),
            Duration::from_secs(1200),
            9,
        )
        .unwrap();
        for _ in 0..100 {
            let value = dist.draw().unwrap();
            assert!(value >= Duration::from_secs(300) && value <= Duration::from_secs(1200));
        }

        assert!(Triangular::new(
            Duration::from_secs(5),
            Duration::from_secs(1),
            Duration::from_secs(10),
            9
        )
        .is_err());
    }

    #[test]
    fn test_sequence_cycles() {
        let mut dist = Sequence::cycle(vec![
            Duration::from_secs(5),
            Duration::from_secs(7),
            Duration::from_secs(3),
        ])
        .unwrap();
        let drawn: Vec<_> = (0..4).map(|_| dist.draw().unwrap().as_secs()).collect();
        assert_eq!(drawn, vec![5, 7, 3, 5]);
        assert!(dist.is_valid());
    }

    #[test]
    fn test_sequence_once_exhausts() {
        let mut dist = Sequence::once(vec![Duration::from_secs(1)]).unwrap();
        assert_eq!(dist.draw(), Some(Duration::from_secs(1)));
        assert!(!dist.is_valid());
        assert_eq!(dist.draw(), None);
        assert_eq!(dist.drawn(), 1);
    }

    #[test]
    fn test_sequence_rejects_empty() {
        assert_eq!(Sequence::once(vec![]).err(), Some(DistributionError::EmptySequence));
    }
}
