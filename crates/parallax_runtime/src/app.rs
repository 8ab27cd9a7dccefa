//! Windowed application
//!
//! Owns the settings context for the life of the process and one render
//! session per live window. Controllers ride the frame scheduler; the
//! settings subscription stages quality changes that the next redraw
//! applies to the surface.

use crate::config::RuntimeConfig;
use anyhow::Result;
use parallax_env::DeviceCapabilities;
use parallax_metrics::{FrameTimer, DEFAULT_FPS_WINDOW};
use parallax_render::{
    window::window_attributes, AdaptiveDpr, AdaptiveLowMode, FrameScheduler, FrameSubscription,
    RenderParameters, RenderSurface, VisibilityGate, WindowSurface,
};
use parallax_services::{
    should_prompt, PerformanceContext, PerformanceMode, PerformanceNotification,
    PerformanceToggle, PreferenceStore, Subscription,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::Key;
use winit::window::{Window, WindowId};

const STATS_INTERVAL: Duration = Duration::from_secs(2);

/// Everything tied to one window. Dropping it cancels the frame and
/// settings subscriptions and releases both writers.
struct Session {
    window: Arc<Window>,
    surface: Rc<RefCell<WindowSurface>>,
    dpr: Rc<RefCell<AdaptiveDpr>>,
    low_mode: Rc<RefCell<AdaptiveLowMode>>,
    pending_quality: Rc<Cell<Option<RenderParameters>>>,
    _frame_sub: FrameSubscription,
    _settings_sub: Subscription,
}

impl Session {
    fn set_enabled(&self, enabled: bool) {
        self.dpr.borrow_mut().set_enabled(enabled);
        self.low_mode.borrow_mut().set_enabled(enabled);
    }

    fn apply_pending_quality(&self) {
        if let Some(params) = self.pending_quality.take() {
            self.surface.borrow_mut().apply_quality(&params);
        }
    }
}

pub struct App {
    config: RuntimeConfig,
    context: PerformanceContext,
    toggle: PerformanceToggle,
    notification: Option<PerformanceNotification>,
    scheduler: FrameScheduler,
    visibility: VisibilityGate,
    timer: FrameTimer,
    started: Instant,
    last_stats: Instant,
    skip_next_frame: bool,
    session: Option<Session>,
}

impl App {
    pub fn new(config: RuntimeConfig, store: PreferenceStore) -> Result<Self> {
        let context = PerformanceContext::new(store);
        let toggle = PerformanceToggle::new(context.handle());
        let visibility = config.visibility_gate()?;

        Ok(Self {
            config,
            context,
            toggle,
            notification: None,
            scheduler: FrameScheduler::new(),
            visibility,
            timer: FrameTimer::new(DEFAULT_FPS_WINDOW),
            started: Instant::now(),
            last_stats: Instant::now(),
            skip_next_frame: false,
            session: None,
        })
    }

    fn start_session(&mut self, window: Arc<Window>) -> Result<Session> {
        let settings = self.context.settings();
        let surface = Rc::new(RefCell::new(WindowSurface::new(Arc::clone(&window))));

        let dpr = Rc::new(RefCell::new(
            AdaptiveDpr::new(self.config.dpr.clone(), settings.dpr_range)
                .with_writer(self.context.claim_dpr_writer()?),
        ));
        let low_mode = Rc::new(RefCell::new(
            AdaptiveLowMode::new(self.config.low_mode.clone())
                .with_writer(self.context.claim_low_mode_writer()?),
        ));

        surface
            .borrow_mut()
            .apply_quality(&RenderParameters::from_settings(&settings));
        dpr.borrow_mut().begin(&mut *surface.borrow_mut());

        let pending_quality = Rc::new(Cell::new(None));
        let settings_sub = {
            let pending = Rc::clone(&pending_quality);
            self.context.subscribe(move |settings| {
                pending.set(Some(RenderParameters::from_settings(settings)));
            })
        };

        let frame_sub = {
            let dpr = Rc::clone(&dpr);
            let low_mode = Rc::clone(&low_mode);
            let surface = Rc::clone(&surface);
            self.scheduler.subscribe(move |frame| {
                dpr.borrow_mut().on_frame(*frame, &mut *surface.borrow_mut());
                low_mode.borrow_mut().on_frame(*frame);
            })
        };

        let session = Session {
            window,
            surface,
            dpr,
            low_mode,
            pending_quality,
            _frame_sub: frame_sub,
            _settings_sub: settings_sub,
        };
        session.set_enabled(self.visibility.is_visible());
        Ok(session)
    }

    fn mount_notification(&mut self) {
        if self.notification.is_some() || !should_prompt(&self.context.settings()) {
            return;
        }
        self.notification = Some(PerformanceNotification::new(
            self.context.handle(),
            self.started.elapsed(),
        ));
    }

    fn poll_notification(&mut self) {
        let Some(notification) = self.notification.as_mut() else {
            return;
        };
        let was_visible = notification.is_visible();
        if notification.poll(self.started.elapsed()) && !was_visible {
            tracing::info!(
                "Performance optimizations available for this device: press A to enable, I to keep full quality"
            );
        }
    }

    fn apply_visibility(&mut self, changed: Option<bool>) {
        let Some(visible) = changed else {
            return;
        };
        tracing::debug!(visible, "visibility changed");
        if visible {
            self.skip_next_frame = true;
        }
        if let Some(session) = &self.session {
            session.set_enabled(visible);
            if visible {
                session.window.request_redraw();
            }
        }
    }

    fn set_occluded(&mut self, occluded: bool) {
        let changed = self.visibility.set_document_visible(!occluded);
        self.apply_visibility(changed);
    }

    fn set_window_area(&mut self, width: u32, height: u32) {
        // Minimized windows report a zero area.
        let ratio = if width == 0 || height == 0 { 0.0 } else { 1.0 };
        let changed = self.visibility.set_intersection_ratio(ratio);
        self.apply_visibility(changed);
    }

    fn keeps_redrawing(&self) -> bool {
        self.visibility.is_visible()
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let Key::Character(text) = &event.logical_key else {
            return;
        };

        let result = match text.to_ascii_lowercase().as_str() {
            "a" => match self.notification.as_mut().filter(|n| n.is_visible()) {
                Some(notification) => notification.on_accept(),
                None => return,
            },
            "i" => match self.notification.as_mut().filter(|n| n.is_visible()) {
                Some(notification) => notification.on_ignore(),
                None => return,
            },
            "l" => self.toggle.on_mode_change(PerformanceMode::Low),
            "h" => self.toggle.on_mode_change(PerformanceMode::High),
            "t" => Ok(self.context.toggle_optimizations()),
            _ => return,
        };

        match result {
            Ok(settings) => tracing::info!(
                mode = ?settings.mode(),
                preference = %settings.preference,
                "performance preference updated"
            ),
            Err(err) => tracing::error!(error = %err, "failed to update performance preference"),
        }
    }

    fn redraw(&mut self) {
        let frame = self.timer.tick();
        self.poll_notification();

        // A resumed window reports one long frame covering the hidden time.
        if std::mem::take(&mut self.skip_next_frame) {
            tracing::trace!(delta = frame.delta, "skipping resume frame");
        } else if self.visibility.is_visible() {
            self.scheduler.dispatch(frame);
        }

        self.log_stats();

        if let Some(session) = &self.session {
            session.apply_pending_quality();
            // Hidden windows idle until `apply_visibility` asks again.
            if self.keeps_redrawing() {
                session.window.request_redraw();
            }
        }
    }

    fn log_stats(&mut self) {
        if self.last_stats.elapsed() < STATS_INTERVAL {
            return;
        }
        self.last_stats = Instant::now();

        let (min_ms, max_ms) = self.timer.frame_time_range_ms();
        let dpr = self
            .session
            .as_ref()
            .map(|session| session.dpr.borrow().current());
        tracing::debug!(
            "FPS: {:.1} ({:.2} ms avg, {:.2}-{:.2} ms), DPR: {:.2}",
            self.timer.fps(),
            self.timer.frame_time_ms(),
            min_ms,
            max_ms,
            dpr.unwrap_or_default()
        );
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }

        let window = match event_loop.create_window(window_attributes(&self.config.window)) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                tracing::error!(error = %err, "failed to create window");
                event_loop.exit();
                return;
            }
        };

        let capabilities = DeviceCapabilities::detect_with_pixel_ratio(Some(window.scale_factor()));
        self.context.initialize(capabilities);
        self.mount_notification();

        match self.start_session(Arc::clone(&window)) {
            Ok(session) => {
                self.timer.reset();
                window.request_redraw();
                self.session = Some(session);
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to start render session");
                event_loop.exit();
            }
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if self.session.take().is_some() {
            tracing::debug!("render session torn down");
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Window close requested");
                self.session = None;
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            WindowEvent::Occluded(occluded) => self.set_occluded(occluded),
            WindowEvent::Resized(size) => {
                self.set_window_area(size.width, size.height);
                if let Some(session) = &self.session {
                    let target = session.surface.borrow().target_size();
                    tracing::debug!(width = target.width, height = target.height, "render target");
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event),
            _ => {}
        }
    }
}
