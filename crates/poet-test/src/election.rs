//! Election Simulator - many validators racing PoET timers
//!
//! Simulates:
//! - A population of validators, each with its own simulated enclave
//! - Rounds where every validator requests a timer on the shared history
//! - The earliest timer winning and committing a certificate
//! - Population changes between rounds

use std::sync::Arc;

use poet_core::{
    Certificate, CertificateId, ManualClock, ParameterStore, ParameterUpdate, PoetError,
    PoetResult, TimeSource,
};
use poet_enclave::SimulatedEnclave;
use poet_timer::TimerEngine;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Simulated validator
pub struct SimulatedValidator {
    pub index: usize,
    pub engine: TimerEngine<SimulatedEnclave>,
}

/// Result of one election round
#[derive(Clone, Debug)]
pub struct RoundOutcome {
    /// Index of the validator whose timer expired first
    pub winner: usize,
    pub local_mean: f64,
    pub duration: f64,
    /// Whether the winner's enclave attested the timer
    pub verified: bool,
    /// Certificate committed by the round, if verified
    pub certificate: Option<Certificate>,
}

/// Multi-validator election simulation
pub struct ElectionSimulator {
    clock: Arc<ManualClock>,
    params: Arc<ParameterStore>,
    validators: Vec<SimulatedValidator>,
    /// Newest first
    history: Vec<Certificate>,
    seed: u64,
    next_index: usize,
}

impl ElectionSimulator {
    /// Create a simulation with `validators` participants and default
    /// parameters
    pub fn new(validators: usize, seed: u64) -> Self {
        let mut sim = ElectionSimulator {
            clock: Arc::new(ManualClock::new(1_000_000.0)),
            params: Arc::new(ParameterStore::default()),
            validators: Vec::new(),
            history: Vec::new(),
            seed,
            next_index: 0,
        };
        sim.add_validators(validators);
        sim
    }

    /// Apply a parameter update shared by every validator
    pub fn reconfigure(&self, update: &ParameterUpdate) -> PoetResult<()> {
        self.params.reconfigure(update).map(|_| ())
    }

    pub fn add_validators(&mut self, count: usize) {
        for _ in 0..count {
            let index = self.next_index;
            self.next_index += 1;
            let enclave = Arc::new(SimulatedEnclave::with_seed(
                self.clock.clone(),
                self.seed.wrapping_add(index as u64),
            ));
            let engine =
                TimerEngine::with_parts(enclave, Arc::clone(&self.params), self.clock.clone());
            self.validators.push(SimulatedValidator { index, engine });
        }
    }

    /// Drop the most recently added validators
    pub fn remove_validators(&mut self, count: usize) {
        let keep = self.validators.len().saturating_sub(count);
        self.validators.truncate(keep);
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    pub fn history(&self) -> &[Certificate] {
        &self.history
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Population estimate a validator would compute from the history
    pub fn population_estimate(&self) -> PoetResult<f64> {
        self.first_engine()?.population_estimate(&self.history)
    }

    /// Local mean the next round will use
    pub fn local_mean(&self) -> PoetResult<f64> {
        self.first_engine()?.local_mean(&self.history)
    }

    fn first_engine(&self) -> PoetResult<&TimerEngine<SimulatedEnclave>> {
        self.validators
            .first()
            .map(|v| &v.engine)
            .ok_or_else(|| PoetError::invalid_argument("simulation has no validators"))
    }

    /// Run one round: every validator draws a timer, the clock jumps to
    /// the earliest deadline and the winner commits a certificate.
    pub fn run_round(&mut self) -> PoetResult<RoundOutcome> {
        let mut timers = self
            .validators
            .iter()
            .map(|v| v.engine.create_wait_timer(&self.history))
            .collect::<PoetResult<Vec<_>>>()?;

        let (winner, _) = timers
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.expires_at().total_cmp(&b.expires_at()))
            .ok_or_else(|| PoetError::invalid_argument("simulation has no validators"))?;

        self.clock.set(timers[winner].expires_at());
        let engine = &self.validators[winner].engine;
        let timer = &mut timers[winner];
        let verified = engine.poll(timer)?;

        let certificate = if verified {
            let certificate = Certificate::new(
                Self::certificate_id(timer.previous_certificate_id(), timer.duration(), timer.local_mean()),
                timer.duration(),
                timer.local_mean(),
            )?;
            self.history.insert(0, certificate.clone());
            Some(certificate)
        } else {
            None
        };

        debug!(
            round = self.history.len(),
            winner = self.validators[winner].index,
            duration = timer.duration(),
            local_mean = timer.local_mean(),
            verified,
            "election round finished"
        );

        Ok(RoundOutcome {
            winner: self.validators[winner].index,
            local_mean: timer.local_mean(),
            duration: timer.duration(),
            verified,
            certificate,
        })
    }

    /// Run `rounds` consecutive rounds
    pub fn run(&mut self, rounds: usize) -> PoetResult<Vec<RoundOutcome>> {
        let outcomes = (0..rounds)
            .map(|_| self.run_round())
            .collect::<PoetResult<Vec<_>>>()?;
        info!(
            rounds,
            validators = self.validators.len(),
            history = self.history.len(),
            "election simulation finished"
        );
        Ok(outcomes)
    }

    fn certificate_id(previous: &CertificateId, duration: f64, local_mean: f64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(previous.as_str().as_bytes());
        hasher.update(duration.to_le_bytes());
        hasher.update(local_mean.to_le_bytes());
        hex::encode(&hasher.finalize()[..8])
    }
}
