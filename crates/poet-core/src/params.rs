//! Consensus parameters and atomic reconfiguration
//!
//! Parameters are an immutable value. Reconfiguration builds a new value
//! from a partial [`ParameterUpdate`], validates it, and swaps it into the
//! [`ParameterStore`] in one step. Readers take an `Arc` snapshot and use
//! it for the whole computation, so they never observe a torn update.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{PoetError, PoetResult};

/// Tunable PoET timing parameters
///
/// Deserialization overlays the given fields on the defaults the same way
/// [`ConsensusParameters::apply`] does, so a config naming only
/// `certificate_sample_length` also moves `fixed_duration_blocks`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParameterUpdate")]
pub struct ConsensusParameters {
    /// Minimum wait time in seconds
    pub minimum_wait_time: f64,
    /// Expected interval between blocks in seconds
    pub target_wait_time: f64,
    /// Local mean the bootstrap ramp converges toward
    pub initial_wait_time: f64,
    /// Certificates sampled for the population estimate
    pub certificate_sample_length: usize,
    /// Below this many certificates the bootstrap ramp is used
    pub fixed_duration_blocks: usize,
}

impl Default for ConsensusParameters {
    fn default() -> Self {
        ConsensusParameters {
            minimum_wait_time: 1.0,
            target_wait_time: 30.0,
            initial_wait_time: 3000.0,
            certificate_sample_length: 50,
            fixed_duration_blocks: 50,
        }
    }
}

impl ConsensusParameters {
    /// Check the invariants every snapshot must satisfy
    pub fn validate(&self) -> PoetResult<()> {
        let finite_positive = [
            ("target_wait_time", self.target_wait_time),
            ("initial_wait_time", self.initial_wait_time),
        ];
        for (name, value) in finite_positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(PoetError::invalid_argument(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        if !self.minimum_wait_time.is_finite() || self.minimum_wait_time < 0.0 {
            return Err(PoetError::invalid_argument(format!(
                "minimum_wait_time must be finite and >= 0, got {}",
                self.minimum_wait_time
            )));
        }
        if self.certificate_sample_length == 0 {
            return Err(PoetError::invalid_argument(
                "certificate_sample_length must be >= 1",
            ));
        }
        // Steady state must always have enough history for the estimator
        if self.fixed_duration_blocks < self.certificate_sample_length {
            return Err(PoetError::invalid_argument(format!(
                "fixed_duration_blocks ({}) must be >= certificate_sample_length ({})",
                self.fixed_duration_blocks, self.certificate_sample_length
            )));
        }
        Ok(())
    }

    /// Return a new parameter set with `update` applied on top of `self`.
    ///
    /// Setting `certificate_sample_length` also resets
    /// `fixed_duration_blocks` unless the same update names it explicitly.
    pub fn apply(&self, update: &ParameterUpdate) -> PoetResult<Self> {
        let mut next = self.clone();
        if let Some(v) = update.minimum_wait_time {
            next.minimum_wait_time = v;
        }
        if let Some(v) = update.target_wait_time {
            next.target_wait_time = v;
        }
        if let Some(v) = update.initial_wait_time {
            next.initial_wait_time = v;
        }
        if let Some(v) = update.certificate_sample_length {
            next.certificate_sample_length = v;
            next.fixed_duration_blocks = v;
        }
        if let Some(v) = update.fixed_duration_blocks {
            next.fixed_duration_blocks = v;
        }
        next.validate()?;
        Ok(next)
    }
}

impl TryFrom<ParameterUpdate> for ConsensusParameters {
    type Error = PoetError;

    fn try_from(update: ParameterUpdate) -> PoetResult<Self> {
        ConsensusParameters::default().apply(&update)
    }
}

/// Partial reconfiguration request; omitted fields keep their value
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterUpdate {
    pub minimum_wait_time: Option<f64>,
    pub target_wait_time: Option<f64>,
    pub initial_wait_time: Option<f64>,
    pub certificate_sample_length: Option<usize>,
    pub fixed_duration_blocks: Option<usize>,
}

impl ParameterUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_minimum_wait_time(mut self, secs: f64) -> Self {
        self.minimum_wait_time = Some(secs);
        self
    }

    pub fn with_target_wait_time(mut self, secs: f64) -> Self {
        self.target_wait_time = Some(secs);
        self
    }

    pub fn with_initial_wait_time(mut self, secs: f64) -> Self {
        self.initial_wait_time = Some(secs);
        self
    }

    pub fn with_certificate_sample_length(mut self, len: usize) -> Self {
        self.certificate_sample_length = Some(len);
        self
    }

    pub fn with_fixed_duration_blocks(mut self, blocks: usize) -> Self {
        self.fixed_duration_blocks = Some(blocks);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Versioned, immutable view of the parameters
#[derive(Clone, Debug)]
pub struct ParameterSnapshot {
    version: u64,
    params: Arc<ConsensusParameters>,
}

impl ParameterSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn params(&self) -> &ConsensusParameters {
        &self.params
    }
}

impl Deref for ParameterSnapshot {
    type Target = ConsensusParameters;

    fn deref(&self) -> &Self::Target {
        &self.params
    }
}

/// Process-wide holder of the current parameter snapshot
#[derive(Debug)]
pub struct ParameterStore {
    current: RwLock<ParameterSnapshot>,
}

impl ParameterStore {
    /// Create a store, validating the initial parameters
    pub fn new(params: ConsensusParameters) -> PoetResult<Self> {
        params.validate()?;
        Ok(ParameterStore {
            current: RwLock::new(ParameterSnapshot {
                version: 0,
                params: Arc::new(params),
            }),
        })
    }

    /// Current snapshot; hold it for the duration of one computation
    pub fn snapshot(&self) -> ParameterSnapshot {
        self.current.read().clone()
    }

    /// Atomically apply `update`. On error the store is unchanged.
    pub fn reconfigure(&self, update: &ParameterUpdate) -> PoetResult<ParameterSnapshot> {
        let mut current = self.current.write();
        let params = current.params.apply(update)?;
        let next = ParameterSnapshot {
            version: current.version + 1,
            params: Arc::new(params),
        };
        *current = next.clone();
        info!(
            version = next.version,
            target_wait_time = next.target_wait_time,
            initial_wait_time = next.initial_wait_time,
            minimum_wait_time = next.minimum_wait_time,
            certificate_sample_length = next.certificate_sample_length,
            fixed_duration_blocks = next.fixed_duration_blocks,
            "consensus parameters reconfigured"
        );
        Ok(next)
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        ParameterStore {
            current: RwLock::new(ParameterSnapshot {
                version: 0,
                params: Arc::new(ConsensusParameters::default()),
            }),
        }
    }
}
