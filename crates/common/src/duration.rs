//! Lock-free aggregate duration bookkeeping.
//!
//! A course's total duration is the sum of its materials' durations.
//! Material updates run concurrently, each adding the new media length
//! and subtracting the replaced one. `DurationTally` accumulates those
//! deltas atomically; the owner reads the combined value once every
//! material task has finished.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Atomic accumulator of media durations, in milliseconds.
#[derive(Debug, Default)]
pub struct DurationTally {
    millis: AtomicU64,
}

impl DurationTally {
    /// Create a tally starting at `initial`.
    pub fn new(initial: Duration) -> Self {
        Self {
            millis: AtomicU64::new(to_millis(initial)),
        }
    }

    /// Add a material's duration and return the new total.
    pub fn add(&self, duration: Duration) -> Duration {
        let delta: u64 = to_millis(duration);
        let previous: u64 = self.millis.fetch_add(delta, Ordering::AcqRel);
        Duration::from_millis(previous.wrapping_add(delta))
    }

    /// Remove a material's duration and return the new total.
    /// Saturates at zero.
    pub fn subtract(&self, duration: Duration) -> Duration {
        let delta: u64 = to_millis(duration);
        self.update(|current| current.saturating_sub(delta))
    }

    /// Replace one duration with another in a single step and return the
    /// new total.
    pub fn replace(&self, old: Duration, new: Duration) -> Duration {
        let (old, new) = (to_millis(old), to_millis(new));
        self.update(|current| current.saturating_sub(old).saturating_add(new))
    }

    /// Current total.
    pub fn total(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::Acquire))
    }

    /// Consume the tally and return the final total.
    pub fn into_total(self) -> Duration {
        Duration::from_millis(self.millis.into_inner())
    }
}

impl DurationTally {
    fn update(&self, apply: impl Fn(u64) -> u64) -> Duration {
        let previous: u64 = match self
            .millis
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| Some(apply(current)))
        {
            Ok(previous) | Err(previous) => previous,
        };
        Duration::from_millis(apply(previous))
    }
}

fn to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
