//! Shared types and utilities for the acourse upload crates.
//!
//! - Size constants used by the transfer engine
//! - Generic progress callback trait
//! - Lock-free duration tally for course records

pub mod constants;
pub mod duration;
pub mod progress;

pub use constants::*;
pub use duration::DurationTally;
pub use progress::{NoOpProgress, ProgressCallback};
