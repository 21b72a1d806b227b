//! Enclave capability
//!
//! The trusted enclave draws and signs wait durations. This crate only
//! consumes it through these traits, so a simulator or a test double can be
//! injected in place of hardware.

use poet_core::PoetResult;

/// Enclave-issued timer handle
pub trait EnclaveTimerHandle {
    fn previous_certificate_id(&self) -> &str;
    fn local_mean(&self) -> f64;
    fn request_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn signature(&self) -> &str;

    /// Opaque persistable form; together with the signature it is all
    /// the enclave needs to rebuild the handle
    fn serialize(&self) -> PoetResult<String>;
}

/// Trusted timer source
pub trait PoetEnclave: Send + Sync {
    type Timer: EnclaveTimerHandle;

    /// Enclave-level minimum wait, used by the population estimate
    fn minimum_wait_time(&self) -> f64;

    /// Draw and sign a new timer.
    /// Fails with `EnclaveUnavailable` if the enclave cannot be reached.
    fn create_wait_timer(
        &self,
        previous_certificate_id: &str,
        local_mean: f64,
    ) -> PoetResult<Self::Timer>;

    /// Rebuild a handle from its serialized form and signature
    fn deserialize_wait_timer(&self, serialized: &str, signature: &str) -> PoetResult<Self::Timer>;

    /// Attest that the timer was honestly generated and has elapsed
    fn verify_wait_timer(&self, timer: &Self::Timer) -> PoetResult<bool>;
}
