//! Rolling frame-rate window

use super::frame_timer::FrameSample;
use super::ring_buffer::RingBuffer;

/// Number of frames averaged by default.
pub const DEFAULT_FPS_WINDOW: usize = 60;

/// Sliding window of instantaneous FPS samples with FIFO eviction.
#[derive(Debug, Clone)]
pub struct FpsWindow {
    samples: RingBuffer<f64>,
}

impl FpsWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: RingBuffer::new(capacity),
        }
    }

    /// Record the frame's instantaneous FPS. Degenerate deltas are skipped.
    pub fn push_frame(&mut self, frame: &FrameSample) -> Option<f64> {
        let fps = frame.fps()?;
        self.samples.push(fps);
        Some(fps)
    }

    pub fn push_fps(&mut self, fps: f64) {
        if fps.is_finite() && fps >= 0.0 {
            self.samples.push(fps);
        }
    }

    /// Mean FPS over the window, `None` while empty.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.samples.average())
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for FpsWindow {
    fn default() -> Self {
        Self::new(DEFAULT_FPS_WINDOW)
    }
}
