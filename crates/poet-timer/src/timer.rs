//! Wait timers - one enclave-issued timer per leader-election attempt
//!
//! A timer is immutable once constructed apart from its lifecycle state.
//! The enclave handle itself is not kept: only its serialized form and
//! signature are, and the enclave rebuilds the handle when verifying.

use std::fmt;
use std::sync::Arc;

use poet_core::{Certificate, CertificateId, ConsensusParameters, PoetError, PoetResult, TimeSource};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{EnclaveTimerHandle, LocalMeanEstimator, PoetEnclave};

/// Slack added to the drawn duration before the timer counts as expired
pub const EXPIRATION_GRACE: f64 = 0.1;

/// Outcome of enclave verification after the deadline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verification {
    /// Deadline passed, verification not completed
    Unverified,
    Verified,
    Invalid,
}

/// Timer lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Created,
    Pending,
    Expired(Verification),
}

/// Durable form of a wait timer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitTimerRecord {
    pub serialized_form: String,
    pub signature: String,
}

/// A wait timer issued by the enclave
pub struct WaitTimer<E: PoetEnclave> {
    enclave: Arc<E>,
    previous_certificate_id: CertificateId,
    local_mean: f64,
    request_time: f64,
    duration: f64,
    signature: String,
    serialized_form: String,
    expires_at: f64,
    state: TimerState,
}

impl<E: PoetEnclave> WaitTimer<E> {
    /// Request a new timer extending the newest certificate in `certificates`.
    ///
    /// `params` must be a single snapshot held for the whole call.
    pub fn create(
        enclave: Arc<E>,
        params: &ConsensusParameters,
        clock: &dyn TimeSource,
        certificates: &[Certificate],
    ) -> PoetResult<Self> {
        let previous_certificate_id = certificates
            .first()
            .map(|certificate| certificate.identifier.clone())
            .unwrap_or_else(CertificateId::null);
        let local_mean =
            LocalMeanEstimator::new(params, enclave.minimum_wait_time()).compute(certificates)?;

        let handle = enclave.create_wait_timer(previous_certificate_id.as_str(), local_mean)?;
        let mut timer = Self::from_handle(enclave, &handle, clock.now())?;
        if timer.duration < params.minimum_wait_time {
            return Err(PoetError::enclave_unavailable(format!(
                "enclave duration {} below minimum wait time {}",
                timer.duration, params.minimum_wait_time
            )));
        }
        timer.state = TimerState::Pending;

        info!("wait timer created; {}", timer);
        Ok(timer)
    }

    /// Rebuild a timer from its durable form through the enclave.
    /// The deadline is anchored to the enclave request time.
    pub fn restore(enclave: Arc<E>, record: &WaitTimerRecord) -> PoetResult<Self> {
        let handle = enclave.deserialize_wait_timer(&record.serialized_form, &record.signature)?;
        let request_time = handle.request_time();
        let mut timer = Self::from_handle(enclave, &handle, request_time)?;
        timer.state = TimerState::Pending;
        Ok(timer)
    }

    fn from_handle(enclave: Arc<E>, handle: &E::Timer, started_at: f64) -> PoetResult<Self> {
        let duration = handle.duration();
        let local_mean = handle.local_mean();
        let request_time = handle.request_time();
        if !duration.is_finite() || duration < 0.0 {
            return Err(PoetError::enclave_unavailable(format!(
                "enclave returned invalid duration {duration}"
            )));
        }
        if !local_mean.is_finite() || local_mean <= 0.0 {
            return Err(PoetError::enclave_unavailable(format!(
                "enclave returned invalid local mean {local_mean}"
            )));
        }
        if !request_time.is_finite() {
            return Err(PoetError::enclave_unavailable("enclave returned invalid request time"));
        }

        Ok(WaitTimer {
            previous_certificate_id: CertificateId::new(handle.previous_certificate_id()),
            local_mean,
            request_time,
            duration,
            signature: handle.signature().to_string(),
            serialized_form: handle.serialize()?,
            expires_at: started_at + duration + EXPIRATION_GRACE,
            state: TimerState::Created,
            enclave,
        })
    }

    /// Whether the timer has expired and the enclave attests to it.
    ///
    /// Before the deadline this is a local comparison with no enclave
    /// interaction. After it, every call re-runs enclave verification;
    /// callers should keep the first result.
    pub fn has_expired(&mut self, now: f64) -> PoetResult<bool> {
        if now < self.expires_at {
            return Ok(false);
        }

        self.state = TimerState::Expired(Verification::Unverified);
        let handle = self
            .enclave
            .deserialize_wait_timer(&self.serialized_form, &self.signature)?;
        let verified = self.enclave.verify_wait_timer(&handle)?;

        self.state = if verified {
            TimerState::Expired(Verification::Verified)
        } else {
            warn!("wait timer failed verification; {}", self);
            TimerState::Expired(Verification::Invalid)
        };
        Ok(verified)
    }

    /// Get the lifecycle state
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Get the certificate this timer extends
    pub fn previous_certificate_id(&self) -> &CertificateId {
        &self.previous_certificate_id
    }

    /// Get the local mean the duration was drawn with
    pub fn local_mean(&self) -> f64 {
        self.local_mean
    }

    /// Get the enclave timestamp of the request
    pub fn request_time(&self) -> f64 {
        self.request_time
    }

    /// Get the drawn wait in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Get the enclave signature
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Get the enclave-serialized timer
    pub fn serialized_form(&self) -> &str {
        &self.serialized_form
    }

    /// Get the earliest local time at which the timer can expire
    pub fn expires_at(&self) -> f64 {
        self.expires_at
    }

    /// Durable form for persistence
    pub fn record(&self) -> WaitTimerRecord {
        WaitTimerRecord {
            serialized_form: self.serialized_form.clone(),
            signature: self.signature.clone(),
        }
    }
}

impl<E: PoetEnclave> fmt::Display for WaitTimer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TIMER, {:.2}, {:.2}, {}",
            self.local_mean, self.duration, self.previous_certificate_id
        )
    }
}

impl<E: PoetEnclave> fmt::Debug for WaitTimer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitTimer")
            .field("previous_certificate_id", &self.previous_certificate_id)
            .field("local_mean", &self.local_mean)
            .field("duration", &self.duration)
            .field("expires_at", &self.expires_at)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEnclave;
    use poet_core::ManualClock;

    fn certs(len: usize) -> Vec<Certificate> {
        (0..len)
            .map(|i| Certificate {
                identifier: format!("cert-{i}").into(),
                duration: 12.0,
                local_mean: 30.0,
            })
            .collect()
    }

    fn setup() -> (Arc<MockEnclave>, ManualClock, ConsensusParameters) {
        (
            Arc::new(MockEnclave::new(5.0)),
            ManualClock::new(1_000.0),
            ConsensusParameters::default(),
        )
    }

    #[test]
    fn test_genesis_timer() {
        let (enclave, clock, params) = setup();
        let timer = WaitTimer::create(Arc::clone(&enclave), &params, &clock, &[]).unwrap();

        assert!(timer.previous_certificate_id().is_null());
        assert_eq!(timer.local_mean(), params.target_wait_time);
        assert_eq!(timer.duration(), 5.0);
        assert_eq!(timer.state(), TimerState::Pending);
        assert!((timer.expires_at() - (1_000.0 + 5.0 + EXPIRATION_GRACE)).abs() < 1e-9);
        assert_eq!(enclave.created(), vec![(CertificateId::NULL.to_string(), 30.0)]);
    }

    #[test]
    fn test_extends_newest_certificate() {
        let (enclave, clock, params) = setup();
        let history = certs(3);
        let timer = WaitTimer::create(enclave, &params, &clock, &history).unwrap();
        assert_eq!(timer.previous_certificate_id().as_str(), "cert-0");
    }

    #[test]
    fn test_bootstrap_ratio_just_below_boundary() {
        let (enclave, clock, params) = setup();
        let count = params.fixed_duration_blocks - 1;
        let timer = WaitTimer::create(enclave, &params, &clock, &certs(count)).unwrap();

        let ratio = count as f64 / params.fixed_duration_blocks as f64;
        let expected = params.target_wait_time * (1.0 - ratio * ratio)
            + params.initial_wait_time * ratio * ratio;
        assert!((timer.local_mean() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_no_verification_before_deadline() {
        let (enclave, clock, params) = setup();
        let mut timer = WaitTimer::create(Arc::clone(&enclave), &params, &clock, &[]).unwrap();

        let deadline = timer.expires_at();
        for now in [0.0, 1_000.0, 1_005.0, deadline - 1e-6] {
            assert!(!timer.has_expired(now).unwrap());
        }
        assert_eq!(enclave.verify_calls(), 0);
        assert_eq!(enclave.deserialize_calls(), 0);
        assert_eq!(timer.state(), TimerState::Pending);
    }

    #[test]
    fn test_verification_once_per_call_after_deadline() {
        let (enclave, clock, params) = setup();
        let mut timer = WaitTimer::create(Arc::clone(&enclave), &params, &clock, &[]).unwrap();
        let deadline = timer.expires_at();

        assert!(timer.has_expired(deadline).unwrap());
        assert_eq!(enclave.verify_calls(), 1);
        assert_eq!(timer.state(), TimerState::Expired(Verification::Verified));

        assert!(timer.has_expired(deadline + 10.0).unwrap());
        assert_eq!(enclave.verify_calls(), 2);
    }

    #[test]
    fn test_invalid_verification_is_not_an_error() {
        let (enclave, clock, params) = setup();
        let mut timer = WaitTimer::create(Arc::clone(&enclave), &params, &clock, &[]).unwrap();
        enclave.set_verify_result(false);

        assert!(!timer.has_expired(timer.expires_at() + 1.0).unwrap());
        assert_eq!(enclave.verify_calls(), 1);
        assert_eq!(timer.state(), TimerState::Expired(Verification::Invalid));
    }

    #[test]
    fn test_verification_failure_leaves_unverified() {
        let (enclave, clock, params) = setup();
        let mut timer = WaitTimer::create(Arc::clone(&enclave), &params, &clock, &[]).unwrap();
        enclave.set_available(false);

        let result = timer.has_expired(timer.expires_at());
        assert!(matches!(result, Err(PoetError::EnclaveUnavailable(_))));
        assert_eq!(timer.state(), TimerState::Expired(Verification::Unverified));
    }

    #[test]
    fn test_create_fails_when_enclave_unavailable() {
        let (enclave, clock, params) = setup();
        enclave.set_available(false);
        let result = WaitTimer::create(enclave, &params, &clock, &[]);
        assert!(matches!(result, Err(PoetError::EnclaveUnavailable(_))));
    }

    #[test]
    fn test_malformed_handle_rejected() {
        let clock = ManualClock::new(0.0);
        let params = ConsensusParameters::default();
        let enclave = Arc::new(MockEnclave::new(-2.0));
        let result = WaitTimer::create(enclave, &params, &clock, &[]);
        assert!(matches!(result, Err(PoetError::EnclaveUnavailable(_))));
    }

    #[test]
    fn test_duration_below_parameter_minimum_rejected() {
        let clock = ManualClock::new(0.0);
        let params = ConsensusParameters {
            minimum_wait_time: 10.0,
            ..ConsensusParameters::default()
        };
        let result = WaitTimer::create(Arc::new(MockEnclave::new(5.0)), &params, &clock, &[]);
        assert!(matches!(result, Err(PoetError::EnclaveUnavailable(_))));
    }

    #[test]
    fn test_degenerate_history_surfaces_from_create() {
        let (enclave, clock, params) = setup();
        // Steady state with waits equal to the enclave minimum
        let history: Vec<Certificate> = (0..params.fixed_duration_blocks)
            .map(|i| Certificate {
                identifier: format!("c{i}").into(),
                duration: enclave.minimum_wait_time(),
                local_mean: 30.0,
            })
            .collect();
        let result = WaitTimer::create(Arc::clone(&enclave), &params, &clock, &history);
        assert!(matches!(result, Err(PoetError::InvalidArgument(_))));
        assert!(enclave.created().is_empty());
    }

    #[test]
    fn test_restore_from_record() {
        let (enclave, clock, params) = setup();
        let timer = WaitTimer::create(Arc::clone(&enclave), &params, &clock, &certs(2)).unwrap();
        let record = timer.record();

        let restored = WaitTimer::restore(Arc::clone(&enclave), &record).unwrap();
        assert_eq!(restored.previous_certificate_id(), timer.previous_certificate_id());
        assert_eq!(restored.local_mean(), timer.local_mean());
        assert_eq!(restored.duration(), timer.duration());
        assert_eq!(restored.signature(), timer.signature());
        assert_eq!(restored.record(), record);
        assert!(
            (restored.expires_at() - (timer.request_time() + timer.duration() + EXPIRATION_GRACE))
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_display() {
        let (enclave, clock, params) = setup();
        let timer = WaitTimer::create(enclave, &params, &clock, &[]).unwrap();
        assert_eq!(timer.to_string(), "TIMER, 30.00, 5.00, 0000000000000000");
    }
}
