//! BUGGIFY-style fault injection
//!
//! Probabilistic store faults for deterministic simulation tests, consumed by
//! [`SimulatedStore`](crate::store::SimulatedStore).

pub mod config;
pub mod faults;

pub use config::FaultConfig;
