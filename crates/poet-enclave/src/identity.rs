//! Enclave signing identity using Ed25519

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Keypair the simulated enclave signs timers with
#[derive(Clone)]
pub struct EnclaveIdentity {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl EnclaveIdentity {
    /// Generate a new random identity
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Create identity from existing signing key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        EnclaveIdentity {
            signing_key,
            verifying_key,
        }
    }

    /// Get the verifying key bytes (public)
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Short fingerprint of the public key (first 8 bytes of SHA-256, hex)
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.verifying_key.as_bytes());
        hex::encode(&hash[..8])
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        let sig = Signature::from_bytes(signature);
        self.verifying_key.verify(message, &sig).is_ok()
    }
}

impl std::fmt::Debug for EnclaveIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnclaveIdentity")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_generation() {
        let id1 = EnclaveIdentity::generate();
        let id2 = EnclaveIdentity::generate();
        assert_ne!(id1.verifying_key_bytes(), id2.verifying_key_bytes());
        assert_eq!(id1.fingerprint().len(), 16);
    }

    #[test]
    fn test_sign_verify() {
        let id = EnclaveIdentity::from_bytes(&[7u8; 32]);
        let sig = id.sign(b"timer");
        assert!(id.verify(b"timer", &sig));
        assert!(!id.verify(b"other", &sig));
    }

    #[test]
    fn test_deterministic_from_bytes() {
        let a = EnclaveIdentity::from_bytes(&[1u8; 32]);
        let b = EnclaveIdentity::from_bytes(&[1u8; 32]);
        assert_eq!(a.verifying_key_bytes(), b.verifying_key_bytes());
    }
}
