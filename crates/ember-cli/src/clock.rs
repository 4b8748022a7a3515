//! Fixed-step frame clock for headless simulation

use std::time::{Duration, Instant};

/// Produces frame timestamps at a fixed rate, independent of wall time, so a
/// headless run is reproducible.
pub struct FrameClock {
    /// Total simulated time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds
    pub delta_time: f64,
    /// Fixed frame interval
    step: Duration,
    /// Timestamp of the latest frame
    now: Instant,
    /// Whether this is the first tick
    first_tick: bool,
}

impl FrameClock {
    /// Create a clock ticking `fps` times per simulated second
    pub fn with_fps(fps: f64) -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            step: Duration::from_secs_f64(1.0 / fps),
            now: Instant::now(),
            first_tick: true,
        }
    }

    /// Advance the clock by one frame and return the frame's timestamp.
    /// The first tick has a zero delta.
    pub fn tick(&mut self) -> Instant {
        if self.first_tick {
            self.first_tick = false;
            self.delta_time = 0.0;
            return self.now;
        }

        self.now += self.step;
        self.delta_time = self.step.as_secs_f64();
        self.total_time += self.delta_time;
        self.now
    }
}
