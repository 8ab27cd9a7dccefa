//! Parallax Runtime
//!
//! Opens a window and keeps its render quality in step with the device
//! and the frame rate it actually achieves.

mod app;
mod config;

use anyhow::{Context, Result};
use winit::event_loop::{ControlFlow, EventLoop};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Parallax v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load()?;
    let store = config.preference_store();

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::App::new(config, store)?;
    event_loop
        .run_app(&mut app)
        .context("event loop exited with an error")?;

    tracing::info!("Runtime shut down");
    Ok(())
}
