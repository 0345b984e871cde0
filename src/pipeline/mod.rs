//! Pipeline entry points for sniper operations.
//!
//! - `run`: One full polling cycle against the live portal
//! - `run_check`: Diff fetched appointments against the seen state

pub mod check;

pub use check::{run, run_check, CheckOutcome};
