//! PoET Enclave - software implementation of the enclave capability
//!
//! Provides:
//! - Enclave signing identity (Ed25519)
//! - Exponential wait-duration draws
//! - Signed, JSON-serialized timer handles and their verification

pub mod identity;
pub mod simulator;

pub use identity::*;
pub use simulator::*;
