//! Frame timing utilities

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// One tick of the frame clock, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    /// Time since the clock started.
    pub elapsed: f64,
    /// Time since the previous frame.
    pub delta: f64,
}

impl FrameSample {
    pub fn new(elapsed: f64, delta: f64) -> Self {
        Self { elapsed, delta }
    }

    /// Instantaneous frame rate, or `None` for a degenerate delta.
    pub fn fps(&self) -> Option<f64> {
        if self.delta.is_finite() && self.delta > 0.0 {
            Some(1.0 / self.delta)
        } else {
            None
        }
    }
}

/// Wall-clock frame clock.
///
/// Call [`FrameTimer::tick`] once per presented frame; the returned
/// [`FrameSample`] feeds the adaptive controllers.
#[derive(Debug)]
pub struct FrameTimer {
    origin: Instant,
    last_frame: Instant,
    frame_times: RingBuffer<Duration>,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self::starting_at(Instant::now(), capacity)
    }

    pub fn starting_at(origin: Instant, capacity: usize) -> Self {
        Self {
            origin,
            last_frame: origin,
            frame_times: RingBuffer::new(capacity),
        }
    }

    /// Restart the clock, dropping recorded frame times.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.origin = now;
        self.last_frame = now;
        self.frame_times.clear();
    }

    pub fn tick(&mut self) -> FrameSample {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameSample {
        let delta = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.frame_times.push(delta);

        FrameSample {
            elapsed: now.saturating_duration_since(self.origin).as_secs_f64(),
            delta: delta.as_secs_f64(),
        }
    }

    pub fn fps(&self) -> f64 {
        let avg = self.frame_times.average();
        if avg.as_secs_f64() > 0.0 {
            1.0 / avg.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.frame_times.average().as_secs_f64() * 1000.0
    }

    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.frame_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}
