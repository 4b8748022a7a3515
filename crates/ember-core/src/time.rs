//! Normalized progress through a longer duration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point within a longer duration, such as a particle's lifetime.
///
/// `0.0` is the start and `1.0` the end of the longer duration. The value
/// may briefly exceed `1.0` on the pass in which a particle dies.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct NormalizedDuration(pub f64);

impl NormalizedDuration {
    pub const START: Self = Self(0.0);
    pub const END: Self = Self(1.0);

    /// `elapsed / total`, or `END` when `total` is zero.
    pub fn from_elapsed(elapsed: Duration, total: Duration) -> Self {
        if total.is_zero() {
            return Self::END;
        }
        Self(elapsed.as_secs_f64() / total.as_secs_f64())
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Converts to an absolute duration with respect to `total`.
    /// `0.0` yields zero, `1.0` yields `total`.
    pub fn duration(self, total: Duration) -> Duration {
        let nanos = total.as_nanos() as f64 * self.0;
        if nanos <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(nanos.round() as u64)
    }
}

impl From<f64> for NormalizedDuration {
    fn from(v: f64) -> Self {
        Self(v)
    }
}
