//! Population and local-mean estimation
//!
//! Every validator draws its wait from an exponential distribution with the
//! same local mean. The minimum of N such draws is exponential with mean
//! `local_mean / N`, so comparing the local means of past winners with the
//! waits they actually observed yields an estimate of N without anyone
//! knowing the population. Scaling the target wait by that estimate keeps
//! the expected winning wait near `target_wait_time`.
//!
//! See "Distribution of the minimum of exponential random variables".

use poet_core::{Certificate, ConsensusParameters, PoetError, PoetResult};
use tracing::debug;

/// Estimates the active validator population from certificate history
#[derive(Clone, Copy, Debug)]
pub struct PopulationEstimator<'a> {
    params: &'a ConsensusParameters,
    /// Enclave-level minimum, not `params.minimum_wait_time`
    enclave_minimum_wait_time: f64,
}

impl<'a> PopulationEstimator<'a> {
    pub fn new(params: &'a ConsensusParameters, enclave_minimum_wait_time: f64) -> Self {
        PopulationEstimator {
            params,
            enclave_minimum_wait_time,
        }
    }

    /// Estimate the population from a newest-first history.
    ///
    /// Only the newest `certificate_sample_length` certificates are summed,
    /// but both averages divide by the full history length. The divisor
    /// cancels in the ratio.
    pub fn estimate(&self, certificates: &[Certificate]) -> PoetResult<f64> {
        let sample_length = self.params.certificate_sample_length;
        if certificates.len() < sample_length {
            return Err(PoetError::invalid_argument(format!(
                "population estimate needs {} certificates, got {}",
                sample_length,
                certificates.len()
            )));
        }

        let (sum_waits, sum_means) = certificates[..sample_length].iter().fold(
            (0.0f64, 0.0f64),
            |(waits, means), certificate| {
                (
                    waits + (certificate.duration - self.enclave_minimum_wait_time),
                    means + certificate.local_mean,
                )
            },
        );

        let count = certificates.len() as f64;
        let avg_wait = sum_waits / count;
        let avg_mean = sum_means / count;

        if !(avg_wait.is_finite() && avg_wait > 0.0) {
            return Err(PoetError::invalid_argument(format!(
                "degenerate history: average wait above minimum is {avg_wait}"
            )));
        }

        let estimate = avg_mean / avg_wait;
        debug!(estimate, avg_mean, avg_wait, "population estimate");
        Ok(estimate)
    }
}

/// Which branch of the local-mean computation applies
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Regime {
    /// Too little history: quadratic ramp from target toward initial wait
    Bootstrap { ratio: f64 },
    /// Enough history: target scaled by the population estimate
    SteadyState,
}

impl Regime {
    /// Select the regime for a history of `count` certificates.
    /// `count == fixed_duration_blocks` is steady state.
    pub fn select(count: usize, params: &ConsensusParameters) -> Self {
        if count < params.fixed_duration_blocks {
            Regime::Bootstrap {
                ratio: count as f64 / params.fixed_duration_blocks as f64,
            }
        } else {
            Regime::SteadyState
        }
    }
}

/// Computes the local mean wait from certificate history
#[derive(Clone, Copy, Debug)]
pub struct LocalMeanEstimator<'a> {
    params: &'a ConsensusParameters,
    enclave_minimum_wait_time: f64,
}

impl<'a> LocalMeanEstimator<'a> {
    pub fn new(params: &'a ConsensusParameters, enclave_minimum_wait_time: f64) -> Self {
        LocalMeanEstimator {
            params,
            enclave_minimum_wait_time,
        }
    }

    pub fn compute(&self, certificates: &[Certificate]) -> PoetResult<f64> {
        let params = self.params;
        let local_mean = match Regime::select(certificates.len(), params) {
            Regime::Bootstrap { ratio } => {
                let weight = ratio * ratio;
                params.target_wait_time * (1.0 - weight) + params.initial_wait_time * weight
            }
            Regime::SteadyState => {
                let population =
                    PopulationEstimator::new(params, self.enclave_minimum_wait_time)
                        .estimate(certificates)?;
                params.target_wait_time * population
            }
        };
        debug!(count = certificates.len(), local_mean, "local mean computed");
        Ok(local_mean)
    }
}
