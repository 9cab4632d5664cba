//! Test utilities for the rollsink workspace
//!
//! This crate provides the helpers the scenario tests share: deterministic
//! clocks, seeded log-file factories, gzip read-back, and polling waits
//! for background-policy effects.

pub mod helpers;

pub use helpers::clock::{frozen_clock, instant_at, SteppingClock};
pub use helpers::log_files::{
    gzipped, log_name, read_gzipped, seed_gzipped_log, seed_log,
};
pub use helpers::wait::wait_until;
