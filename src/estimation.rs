//! Size-estimation strategies.
//!
//! A strategy maps a job's true size to the estimate handed to the
//! scheduling policy at admission. The estimate is computed exactly once
//! per job; the simulator keeps tracking true remaining work on its own,
//! so estimation error only influences scheduling decisions, never the
//! physics of the run.
//!
//! Strategies with synthetic noise draw from a seeded RNG, so a run is
//! fully reproducible given the same seed.
//!
//! # Reference
//! Dell'Amico, Carra & Michiardi (2014), "Revisiting Size-Based
//! Scheduling with Estimated Job Sizes"

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, LogNormal, Normal};

use crate::error::SimulationError;
use crate::validation::{ValidationError, ValidationErrorKind};

/// Size-estimation strategy configuration.
///
/// Built into a stateful [`sampler`](Self::sampler) once per simulation
/// run, so repeated runs of the same `Simulator` are independent.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeEstimation {
    /// Oracle scheduling: the estimate equals the true size.
    Exact,
    /// Multiplicative log-normal noise: `x · exp(N(0, σ))`.
    LogNormal { sigma: f64 },
    /// Multiplicative normal noise with a scale factor:
    /// `factor · x · (1 + N(0, σ))`.
    Normal { sigma: f64, factor: f64 },
    /// Replays a precomputed estimate per admission, in arrival order.
    ///
    /// Used when estimates come from an external predictor rather than
    /// synthetic noise. Exhausting the sequence aborts the run.
    Fixed(Vec<f64>),
}

impl SizeEstimation {
    /// Normal multiplicative noise without scaling.
    pub fn normal(sigma: f64) -> Self {
        Self::Normal { sigma, factor: 1.0 }
    }

    /// Builds the per-run sampler, validating strategy parameters.
    pub(crate) fn sampler(&self, seed: u64) -> Result<SizeSampler, ValidationError> {
        let state = match self {
            Self::Exact => SamplerState::Exact,
            Self::LogNormal { sigma } => {
                let dist = LogNormal::new(0.0, *sigma).map_err(|_| {
                    ValidationError::new(
                        ValidationErrorKind::InvalidEstimationParameter,
                        format!("log-normal sigma must be finite and non-negative, got {sigma}"),
                    )
                })?;
                SamplerState::LogNormal {
                    rng: StdRng::seed_from_u64(seed),
                    dist,
                }
            }
            Self::Normal { sigma, factor } => {
                if !factor.is_finite() {
                    return Err(ValidationError::new(
                        ValidationErrorKind::InvalidEstimationParameter,
                        format!("normal-noise factor must be finite, got {factor}"),
                    ));
                }
                let dist = Normal::new(1.0, *sigma).map_err(|_| {
                    ValidationError::new(
                        ValidationErrorKind::InvalidEstimationParameter,
                        format!("normal-noise sigma must be finite and non-negative, got {sigma}"),
                    )
                })?;
                SamplerState::Normal {
                    rng: StdRng::seed_from_u64(seed),
                    dist,
                    factor: *factor,
                }
            }
            Self::Fixed(values) => SamplerState::Fixed {
                values: values.clone(),
                next: 0,
            },
        };
        Ok(SizeSampler { state })
    }
}

/// Stateful estimate source for one simulation run.
#[derive(Debug, Clone)]
pub(crate) struct SizeSampler {
    state: SamplerState,
}

#[derive(Debug, Clone)]
enum SamplerState {
    Exact,
    LogNormal {
        rng: StdRng,
        dist: LogNormal<f64>,
    },
    Normal {
        rng: StdRng,
        dist: Normal<f64>,
        factor: f64,
    },
    Fixed {
        values: Vec<f64>,
        next: usize,
    },
}

impl SizeSampler {
    /// Estimates one job's size from its true size.
    pub fn estimate(&mut self, size: f64) -> Result<f64, SimulationError> {
        match &mut self.state {
            SamplerState::Exact => Ok(size),
            SamplerState::LogNormal { rng, dist } => Ok(size * dist.sample(rng)),
            SamplerState::Normal { rng, dist, factor } => Ok(*factor * size * dist.sample(rng)),
            SamplerState::Fixed { values, next } => match values.get(*next) {
                Some(&value) => {
                    *next += 1;
                    Ok(value)
                }
                None => Err(SimulationError::EstimatesExhausted),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_is_identity() {
        let mut sampler = SizeEstimation::Exact.sampler(0).unwrap();
        assert_eq!(sampler.estimate(12.5).unwrap(), 12.5);
        assert_eq!(sampler.estimate(0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_log_normal_zero_sigma_is_identity() {
        // exp(N(0, 0)) = 1
        let mut sampler = SizeEstimation::LogNormal { sigma: 0.0 }.sampler(7).unwrap();
        assert!((sampler.estimate(4.0).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_normal_zero_sigma_applies_factor() {
        let mut sampler = SizeEstimation::Normal {
            sigma: 0.0,
            factor: 2.0,
        }
        .sampler(7)
        .unwrap();
        assert!((sampler.estimate(4.0).unwrap() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_noise_is_reproducible_per_seed() {
        let strategy = SizeEstimation::LogNormal { sigma: 0.5 };
        let mut a = strategy.sampler(42).unwrap();
        let mut b = strategy.sampler(42).unwrap();
        for _ in 0..10 {
            assert_eq!(a.estimate(3.0).unwrap(), b.estimate(3.0).unwrap());
        }
    }

    #[test]
    fn test_fixed_replays_in_order_then_fails() {
        let mut sampler = SizeEstimation::Fixed(vec![15.0, 20.0]).sampler(0).unwrap();
        assert_eq!(sampler.estimate(10.0).unwrap(), 15.0);
        assert_eq!(sampler.estimate(10.0).unwrap(), 20.0);
        assert_eq!(
            sampler.estimate(10.0),
            Err(SimulationError::EstimatesExhausted)
        );
    }

    #[test]
    fn test_negative_sigma_is_rejected() {
        let err = SizeEstimation::LogNormal { sigma: -1.0 }
            .sampler(0)
            .unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidEstimationParameter);

        let err = SizeEstimation::normal(f64::NAN).sampler(0).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidEstimationParameter);
    }
}
