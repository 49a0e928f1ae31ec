//! Parameter sweep launcher for the DisasterRecovery ns-3 scenario.
//!
//! Enumerates every combination of the swept parameters, prepares the
//! results CSV, and runs the simulator once per combination through its
//! build/run wrapper.

pub mod cli;
pub mod config;
pub mod error;
pub mod invoke;
pub mod manifest;
pub mod orchestrator;
pub mod printer;
pub mod results;
pub mod sweep;

pub use config::{FailurePolicy, SweepConfig};
pub use error::{Result, SweepError};
