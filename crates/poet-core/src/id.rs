//! Identity types for PoET consensus
//!
//! Certificate identifiers are opaque strings issued by the block-commit
//! path. The genesis round extends the null identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a committed block / won round
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(String);

impl CertificateId {
    /// Identifier extended by the first timer of a chain
    pub const NULL: &'static str = "0000000000000000";

    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        CertificateId(id.into())
    }

    #[inline]
    pub fn null() -> Self {
        CertificateId(Self::NULL.to_string())
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == Self::NULL
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CertificateId {
    fn default() -> Self {
        Self::null()
    }
}

impl From<&str> for CertificateId {
    fn from(id: &str) -> Self {
        CertificateId::new(id)
    }
}

impl From<String> for CertificateId {
    fn from(id: String) -> Self {
        CertificateId(id)
    }
}

impl AsRef<str> for CertificateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cert({})", self.0)
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
