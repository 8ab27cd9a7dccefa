//! Parallax Metrics - frame timing for the adaptive render loop
//!
//! - [`RingBuffer`]: fixed-capacity rolling sample store
//! - [`FpsWindow`]: sliding window of instantaneous frame rates
//! - [`FrameTimer`]: wall-clock frame clock producing [`FrameSample`]s
//!
//! # Usage
//!
//! ```ignore
//! use parallax_metrics::{FpsWindow, FrameTimer};
//!
//! let mut timer = FrameTimer::new(60);
//! let mut window = FpsWindow::default();
//! // once per presented frame:
//! let frame = timer.tick();
//! window.push_frame(&frame);
//! println!("FPS: {:.1}", window.mean().unwrap_or_default());
//! ```

mod fps_window;
mod frame_timer;
mod ring_buffer;

pub use fps_window::{FpsWindow, DEFAULT_FPS_WINDOW};
pub use frame_timer::{FrameSample, FrameTimer};
pub use ring_buffer::RingBuffer;
