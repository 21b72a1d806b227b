//! Software enclave simulator
//!
//! Draws wait durations from an exponential distribution, signs them with
//! an Ed25519 identity and serializes the signed body as JSON. It offers no
//! hardware guarantees; it exists so validators and tests can run the full
//! timer lifecycle without a trusted execution environment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use poet_core::{PoetError, PoetResult, TimeSource};
use poet_timer::{EnclaveTimerHandle, PoetEnclave};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::EnclaveIdentity;

/// Smallest duration the simulator ever issues
pub const MINIMUM_WAIT_TIME: f64 = 1.0;

/// Signed contents of a simulated timer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TimerBody {
    previous_certificate_id: String,
    local_mean: f64,
    request_time: f64,
    duration: f64,
}

impl TimerBody {
    fn to_json(&self) -> PoetResult<String> {
        serde_json::to_string(self)
            .map_err(|e| PoetError::enclave_unavailable(format!("timer encoding failed: {e}")))
    }
}

/// Timer handle issued by [`SimulatedEnclave`]
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedWaitTimer {
    body: TimerBody,
    signature: String,
}

impl EnclaveTimerHandle for SimulatedWaitTimer {
    fn previous_certificate_id(&self) -> &str {
        &self.body.previous_certificate_id
    }

    fn local_mean(&self) -> f64 {
        self.body.local_mean
    }

    fn request_time(&self) -> f64 {
        self.body.request_time
    }

    fn duration(&self) -> f64 {
        self.body.duration
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn serialize(&self) -> PoetResult<String> {
        self.body.to_json()
    }
}

/// Enclave simulator
pub struct SimulatedEnclave {
    identity: EnclaveIdentity,
    clock: Arc<dyn TimeSource>,
    rng: Mutex<StdRng>,
    available: AtomicBool,
}

impl SimulatedEnclave {
    /// Simulator with a fresh random identity
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        SimulatedEnclave {
            identity: EnclaveIdentity::generate(),
            clock,
            rng: Mutex::new(StdRng::from_entropy()),
            available: AtomicBool::new(true),
        }
    }

    /// Deterministic simulator: identity and draws derive from `seed`
    pub fn with_seed(clock: Arc<dyn TimeSource>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let key: [u8; 32] = rng.gen();
        SimulatedEnclave {
            identity: EnclaveIdentity::from_bytes(&key),
            clock,
            rng: Mutex::new(rng),
            available: AtomicBool::new(true),
        }
    }

    pub fn identity(&self) -> &EnclaveIdentity {
        &self.identity
    }

    /// Simulate an outage; every call fails with `EnclaveUnavailable`
    /// until re-enabled
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> PoetResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PoetError::enclave_unavailable("simulated enclave offline"))
        }
    }

    /// Exponential draw with mean `local_mean`, offset by the minimum
    fn draw_duration(&self, local_mean: f64) -> f64 {
        // 1 - [0, 1) keeps ln() away from zero
        let u: f64 = 1.0 - self.rng.lock().gen::<f64>();
        MINIMUM_WAIT_TIME - local_mean * u.ln()
    }

    fn sign_body(&self, body: &TimerBody) -> PoetResult<String> {
        let message = body.to_json()?;
        Ok(hex::encode(self.identity.sign(message.as_bytes())))
    }
}

impl PoetEnclave for SimulatedEnclave {
    type Timer = SimulatedWaitTimer;

    fn minimum_wait_time(&self) -> f64 {
        MINIMUM_WAIT_TIME
    }

    fn create_wait_timer(
        &self,
        previous_certificate_id: &str,
        local_mean: f64,
    ) -> PoetResult<SimulatedWaitTimer> {
        self.check_available()?;
        if !local_mean.is_finite() || local_mean <= 0.0 {
            return Err(PoetError::invalid_argument(format!(
                "local mean must be finite and > 0, got {local_mean}"
            )));
        }

        let body = TimerBody {
            previous_certificate_id: previous_certificate_id.to_string(),
            local_mean,
            request_time: self.clock.now(),
            duration: self.draw_duration(local_mean),
        };
        let signature = self.sign_body(&body)?;
        debug!(
            enclave = %self.identity.fingerprint(),
            duration = body.duration,
            local_mean,
            "simulated timer issued"
        );
        Ok(SimulatedWaitTimer { body, signature })
    }

    fn deserialize_wait_timer(
        &self,
        serialized: &str,
        signature: &str,
    ) -> PoetResult<SimulatedWaitTimer> {
        self.check_available()?;
        let body: TimerBody = serde_json::from_str(serialized)
            .map_err(|e| PoetError::enclave_unavailable(format!("malformed timer: {e}")))?;
        Ok(SimulatedWaitTimer {
            body,
            signature: signature.to_string(),
        })
    }

    fn verify_wait_timer(&self, timer: &SimulatedWaitTimer) -> PoetResult<bool> {
        self.check_available()?;

        let signature: [u8; 64] = match hex::decode(&timer.signature)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
        {
            Some(sig) => sig,
            None => return Ok(false),
        };
        let message = timer.body.to_json()?;
        if !self.identity.verify(message.as_bytes(), &signature) {
            return Ok(false);
        }
        if timer.body.duration < MINIMUM_WAIT_TIME {
            return Ok(false);
        }

        // A timer is only a proof once its duration has actually elapsed
        Ok(self.clock.now() >= timer.body.request_time + timer.body.duration)
    }
}
