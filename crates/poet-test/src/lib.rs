//! PoET Test Harness - election simulation and protocol validation
//!
//! This crate provides:
//! - Multi-validator election simulation over simulated enclaves
//! - Certificate history generation
//! - Tracing setup for tests

pub mod election;
pub mod logging;

pub use election::*;
pub use logging::*;
