//! Per-frame callback registration.

use parallax_metrics::FrameSample;
use parallax_services::{Listeners, Subscription};

/// Keeps a frame callback alive. Dropping it stops the callback.
pub type FrameSubscription = Subscription;

/// Fans each presented frame out to the registered callbacks.
///
/// The owner of a surface holds the subscriptions for the work it drives;
/// tearing the surface down drops them, so nothing keeps running against
/// state whose reason to exist is gone.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    callbacks: Listeners<FrameSample>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> FrameSubscription
    where
        F: FnMut(&FrameSample) + 'static,
    {
        self.callbacks.subscribe(callback)
    }

    pub fn dispatch(&self, frame: FrameSample) {
        self.callbacks.notify(&frame);
    }

    pub fn subscriber_count(&self) -> usize {
        self.callbacks.len()
    }
}
