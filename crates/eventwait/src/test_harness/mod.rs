//! Test harness
//!
//! Drives the waiter against scripted providers to exercise its
//! concurrency guarantees outside of a real accessibility runtime.

pub mod simulator;

pub use simulator::{run_simulation, SimulationReport, SimulatorConfig, SimulatorStats, Violation};
