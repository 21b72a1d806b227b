//! Wait certificates - records of previously won rounds
//!
//! Histories are always handled as slices ordered newest first; sampling
//! takes a prefix.

use serde::{Deserialize, Serialize};

use crate::{CertificateId, PoetError, PoetResult};

/// A committed wait certificate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    /// Block / round this certificate committed
    pub identifier: CertificateId,
    /// Winning wait duration in seconds
    pub duration: f64,
    /// Local mean in effect when the winning timer was created
    pub local_mean: f64,
}

impl Certificate {
    /// Create a certificate, rejecting negative durations and
    /// non-positive means
    pub fn new(identifier: impl Into<CertificateId>, duration: f64, local_mean: f64) -> PoetResult<Self> {
        let certificate = Certificate {
            identifier: identifier.into(),
            duration,
            local_mean,
        };
        certificate.validate()?;
        Ok(certificate)
    }

    pub fn validate(&self) -> PoetResult<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(PoetError::invalid_argument(format!(
                "certificate {} has invalid duration {}",
                self.identifier, self.duration
            )));
        }
        if !self.local_mean.is_finite() || self.local_mean <= 0.0 {
            return Err(PoetError::invalid_argument(format!(
                "certificate {} has invalid local mean {}",
                self.identifier, self.local_mean
            )));
        }
        Ok(())
    }
}
