//! Safety monitoring
//!
//! Detects boiler fault conditions; the boiler controller turns them
//! into its ERROR state.

pub mod monitor;

pub use monitor::{SafetyLimits, SafetyMonitor, SafetyStatus};
