//! PoET Timer - adaptive wait timers for Proof-of-Elapsed-Time election
//!
//! This crate implements:
//! - Population estimation from wait-certificate history
//! - Local-mean computation (bootstrap ramp and steady state)
//! - Enclave capability traits
//! - Wait timer lifecycle (create, expire, verify)
//! - Timer engine binding enclave, parameters and clock

pub mod enclave;
pub mod engine;
pub mod estimator;
pub mod timer;

#[cfg(test)]
mod mock;

pub use enclave::*;
pub use engine::*;
pub use estimator::*;
pub use timer::*;
