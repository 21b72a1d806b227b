//! PoET Core - Fundamental types and primitives
//!
//! This crate defines the types shared by the PoET timing crates:
//! - Certificate identifiers and wait certificates
//! - Consensus parameters and atomic reconfiguration
//! - Time sources
//! - Error types

pub mod certificate;
pub mod error;
pub mod id;
pub mod params;
pub mod time;

pub use certificate::*;
pub use error::*;
pub use id::*;
pub use params::*;
pub use time::*;
