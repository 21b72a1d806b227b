//! Timer Engine - binds an enclave, the parameter store and a clock
//!
//! Every operation reads one parameter snapshot up front, so a concurrent
//! reconfiguration never changes parameters halfway through a call.

use std::sync::Arc;

use poet_core::{
    Certificate, ParameterSnapshot, ParameterStore, ParameterUpdate, PoetResult, SystemClock,
    TimeSource,
};

use crate::{LocalMeanEstimator, PoetEnclave, PopulationEstimator, WaitTimer, WaitTimerRecord};

pub struct TimerEngine<E: PoetEnclave> {
    enclave: Arc<E>,
    params: Arc<ParameterStore>,
    clock: Arc<dyn TimeSource>,
}

impl<E: PoetEnclave> TimerEngine<E> {
    /// Engine with default parameters and the system clock
    pub fn new(enclave: Arc<E>) -> Self {
        Self::with_parts(enclave, Arc::new(ParameterStore::default()), Arc::new(SystemClock))
    }

    pub fn with_parts(
        enclave: Arc<E>,
        params: Arc<ParameterStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        TimerEngine {
            enclave,
            params,
            clock,
        }
    }

    /// Start a leader-election attempt on top of `certificates`
    /// (newest first)
    pub fn create_wait_timer(&self, certificates: &[Certificate]) -> PoetResult<WaitTimer<E>> {
        let snapshot = self.params.snapshot();
        WaitTimer::create(
            Arc::clone(&self.enclave),
            &snapshot,
            self.clock.as_ref(),
            certificates,
        )
    }

    /// Rebuild a timer from its durable form
    pub fn restore_wait_timer(&self, record: &WaitTimerRecord) -> PoetResult<WaitTimer<E>> {
        WaitTimer::restore(Arc::clone(&self.enclave), record)
    }

    /// Check `timer` against the engine clock
    pub fn poll(&self, timer: &mut WaitTimer<E>) -> PoetResult<bool> {
        timer.has_expired(self.clock.now())
    }

    /// Local mean a timer created now would use
    pub fn local_mean(&self, certificates: &[Certificate]) -> PoetResult<f64> {
        let snapshot = self.params.snapshot();
        LocalMeanEstimator::new(&snapshot, self.enclave.minimum_wait_time()).compute(certificates)
    }

    /// Population estimate from `certificates` under the current parameters
    pub fn population_estimate(&self, certificates: &[Certificate]) -> PoetResult<f64> {
        let snapshot = self.params.snapshot();
        PopulationEstimator::new(&snapshot, self.enclave.minimum_wait_time())
            .estimate(certificates)
    }

    /// Atomically apply a parameter update
    pub fn reconfigure(&self, update: &ParameterUpdate) -> PoetResult<ParameterSnapshot> {
        self.params.reconfigure(update)
    }

    /// Get the current parameter snapshot
    pub fn params(&self) -> ParameterSnapshot {
        self.params.snapshot()
    }

    /// Get the enclave
    pub fn enclave(&self) -> &Arc<E> {
        &self.enclave
    }

    /// Get the clock
    pub fn clock(&self) -> &Arc<dyn TimeSource> {
        &self.clock
    }
}

impl<E: PoetEnclave> Clone for TimerEngine<E> {
    fn clone(&self) -> Self {
        TimerEngine {
            enclave: Arc::clone(&self.enclave),
            params: Arc::clone(&self.params),
            clock: Arc::clone(&self.clock),
        }
    }
}
