//! Frame-rate feedback controllers
//!
//! Both controllers share [`SampleGate`]: a rolling FPS window plus a
//! cooldown since the last accepted adjustment. The window is sampled every
//! frame; a decision is only evaluated once the cooldown has passed.
//!
//! - [`AdaptiveDpr`] walks the pixel ratio down fast and up slowly around a
//!   dead band.
//! - [`AdaptiveLowMode`] flips a boolean with separate enter/exit thresholds.

use crate::error::ConfigError;
use crate::surface::PixelRatioTarget;
use parallax_env::DprRange;
use parallax_metrics::{FpsWindow, FrameSample, DEFAULT_FPS_WINDOW};
use parallax_services::{DprWriter, LowModeWriter};
use serde::{Deserialize, Serialize};

/// DPR steps are rounded to this many units per 1.0 so repeated `+0.05`
/// lands exactly on the bounds.
const DPR_QUANTA: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DprControllerConfig {
    pub target_fps: f64,
    /// Half-width of the band around `target_fps` with no adjustment.
    pub dead_band: f64,
    pub step_down: f64,
    pub step_up: f64,
    pub cooldown_secs: f64,
    pub window: usize,
}

impl Default for DprControllerConfig {
    fn default() -> Self {
        Self {
            target_fps: 55.0,
            dead_band: 10.0,
            step_down: 0.1,
            step_up: 0.05,
            cooldown_secs: 2.0,
            window: DEFAULT_FPS_WINDOW,
        }
    }
}

impl DprControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("dpr.target_fps", self.target_fps)?;
        non_negative("dpr.dead_band", self.dead_band)?;
        positive("dpr.step_down", self.step_down)?;
        positive("dpr.step_up", self.step_up)?;
        non_negative("dpr.cooldown_secs", self.cooldown_secs)?;
        if self.window == 0 {
            return Err(ConfigError::EmptyWindow { controller: "dpr" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowModeConfig {
    pub enter_fps: f64,
    pub exit_fps: f64,
    pub cooldown_secs: f64,
    pub window: usize,
}

impl Default for LowModeConfig {
    fn default() -> Self {
        Self {
            enter_fps: 40.0,
            exit_fps: 55.0,
            cooldown_secs: 1.0,
            window: DEFAULT_FPS_WINDOW,
        }
    }
}

impl LowModeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("low_mode.enter_fps", self.enter_fps)?;
        positive("low_mode.exit_fps", self.exit_fps)?;
        non_negative("low_mode.cooldown_secs", self.cooldown_secs)?;
        if self.window == 0 {
            return Err(ConfigError::EmptyWindow { controller: "low_mode" });
        }
        if self.exit_fps <= self.enter_fps {
            return Err(ConfigError::InvertedThresholds {
                enter: self.enter_fps,
                exit: self.exit_fps,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

/// Rolling FPS window with an adjustment cooldown.
#[derive(Debug, Clone)]
pub struct SampleGate {
    window: FpsWindow,
    cooldown: f64,
    last_adjustment: f64,
    enabled: bool,
    resumed: bool,
}

impl SampleGate {
    pub fn new(window: usize, cooldown_secs: f64) -> Self {
        Self {
            window: FpsWindow::new(window),
            cooldown: cooldown_secs,
            last_adjustment: 0.0,
            enabled: true,
            resumed: false,
        }
    }

    /// Record the frame. Returns the window mean when a decision is due.
    pub fn observe(&mut self, frame: &FrameSample) -> Option<f64> {
        if !self.enabled {
            return None;
        }

        self.window.push_frame(frame);

        if std::mem::take(&mut self.resumed) {
            self.last_adjustment = frame.elapsed;
        } else if frame.elapsed < self.last_adjustment {
            // Frame clock restarted underneath us.
            tracing::debug!(elapsed = frame.elapsed, "frame clock went backwards, rebasing cooldown");
            self.last_adjustment = frame.elapsed;
        }
        if frame.elapsed - self.last_adjustment < self.cooldown {
            return None;
        }

        self.window.mean()
    }

    pub fn mark_adjusted(&mut self, elapsed: f64) {
        self.last_adjustment = elapsed;
    }

    /// Disabled gates neither sample nor move the cooldown. Re-enabling
    /// starts again from an empty window, with a full cooldown counted
    /// from the first frame that follows.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.window.clear();
            self.resumed = true;
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_adjustment(&self) -> f64 {
        self.last_adjustment
    }

    pub fn samples(&self) -> usize {
        self.window.len()
    }
}

/// One accepted DPR step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DprChange {
    pub from: f64,
    pub to: f64,
    pub mean_fps: f64,
    pub at: f64,
}

/// Continuous pixel-ratio controller.
///
/// Owns `current_dpr` for its render session: every change goes to the
/// surface and, when a [`DprWriter`] is attached, to the settings context
/// in the same call.
#[derive(Debug)]
pub struct AdaptiveDpr {
    config: DprControllerConfig,
    range: DprRange,
    current: f64,
    gate: SampleGate,
    writer: Option<DprWriter>,
}

impl AdaptiveDpr {
    /// Start a session at the top of `range`.
    pub fn new(config: DprControllerConfig, range: DprRange) -> Self {
        let gate = SampleGate::new(config.window, config.cooldown_secs);
        Self {
            current: range.max,
            config,
            range,
            gate,
            writer: None,
        }
    }

    pub fn with_initial(mut self, dpr: f64) -> Self {
        self.current = self.range.clamp(dpr);
        self
    }

    pub fn with_writer(mut self, writer: DprWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Push the session's starting value to the surface and the context.
    pub fn begin<S: PixelRatioTarget + ?Sized>(&mut self, surface: &mut S) {
        self.apply(self.current, surface);
    }

    pub fn on_frame<S: PixelRatioTarget + ?Sized>(
        &mut self,
        frame: FrameSample,
        surface: &mut S,
    ) -> Option<DprChange> {
        let mean_fps = self.gate.observe(&frame)?;

        let lower = self.config.target_fps - self.config.dead_band;
        let upper = self.config.target_fps + self.config.dead_band;

        let next = if mean_fps < lower && self.current > self.range.min {
            self.range.clamp(quantize(self.current - self.config.step_down))
        } else if mean_fps > upper && self.current < self.range.max {
            self.range.clamp(quantize(self.current + self.config.step_up))
        } else {
            return None;
        };

        let change = DprChange {
            from: self.current,
            to: next,
            mean_fps,
            at: frame.elapsed,
        };
        self.apply(next, surface);
        self.gate.mark_adjusted(frame.elapsed);

        if change.to < change.from {
            tracing::info!("DPR lowered to {:.2} (FPS: {:.1})", next, mean_fps);
        } else {
            tracing::info!("DPR increased to {:.2} (FPS: {:.1})", next, mean_fps);
        }
        Some(change)
    }

    fn apply<S: PixelRatioTarget + ?Sized>(&mut self, dpr: f64, surface: &mut S) {
        self.current = dpr;
        surface.set_pixel_ratio(dpr);
        if let Some(writer) = &self.writer {
            if let Err(err) = writer.set(dpr) {
                tracing::debug!(error = %err, "settings context gone, DPR not published");
            }
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn range(&self) -> DprRange {
        self.range
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.gate.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    pub fn gate(&self) -> &SampleGate {
        &self.gate
    }
}

fn quantize(value: f64) -> f64 {
    (value * DPR_QUANTA).round() / DPR_QUANTA
}

/// Discrete low-quality mode with an enter/exit hysteresis band.
#[derive(Debug)]
pub struct AdaptiveLowMode {
    config: LowModeConfig,
    low_mode: bool,
    gate: SampleGate,
    writer: Option<LowModeWriter>,
}

impl AdaptiveLowMode {
    pub fn new(config: LowModeConfig) -> Self {
        let gate = SampleGate::new(config.window, config.cooldown_secs);
        Self {
            config,
            low_mode: false,
            gate,
            writer: None,
        }
    }

    pub fn with_writer(mut self, writer: LowModeWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Returns the new mode when it flipped on this frame.
    pub fn on_frame(&mut self, frame: FrameSample) -> Option<bool> {
        let mean_fps = self.gate.observe(&frame)?;

        let next = if !self.low_mode && mean_fps < self.config.enter_fps {
            true
        } else if self.low_mode && mean_fps > self.config.exit_fps {
            false
        } else {
            return None;
        };

        self.low_mode = next;
        self.gate.mark_adjusted(frame.elapsed);
        if let Some(writer) = &self.writer {
            if let Err(err) = writer.set(next) {
                tracing::debug!(error = %err, "settings context gone, low mode not published");
            }
        }

        if next {
            tracing::info!("low mode enabled (FPS: {:.1})", mean_fps);
        } else {
            tracing::info!("low mode disabled (FPS: {:.1})", mean_fps);
        }
        Some(next)
    }

    pub fn is_low(&self) -> bool {
        self.low_mode
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.gate.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;

    /// Frames at a constant rate, starting one frame after t=0.
    fn frames(fps: f64, start: f64, seconds: f64) -> impl Iterator<Item = FrameSample> {
        let delta = 1.0 / fps;
        let count = (seconds * fps).round() as usize;
        (1..=count).map(move |i| FrameSample::new(start + i as f64 * delta, delta))
    }

    fn mid_range() -> DprRange {
        DprRange::new(1.0, 1.5)
    }

    #[test]
    fn test_dead_band_never_adjusts() {
        let mut dpr = AdaptiveDpr::new(DprControllerConfig::default(), mid_range()).with_initial(1.2);
        let mut surface = RecordingSurface::default();

        for fps in [46.0, 55.0, 64.0] {
            for frame in frames(fps, 0.0, 10.0) {
                assert!(dpr.on_frame(frame, &mut surface).is_none());
            }
        }
        assert_eq!(dpr.current(), 1.2);
        assert!(surface.pixel_ratio_history.is_empty());
    }

    #[test]
    fn test_high_fps_steps_up_every_cooldown() {
        let mut dpr = AdaptiveDpr::new(DprControllerConfig::default(), mid_range()).with_initial(1.0);
        let mut surface = RecordingSurface::default();

        let changes: Vec<DprChange> = frames(70.0, 0.0, 5.5)
            .filter_map(|frame| dpr.on_frame(frame, &mut surface))
            .collect();

        assert_eq!(changes.len(), 2);
        assert!((changes[0].to - 1.05).abs() < 1e-9);
        assert!((changes[1].to - 1.10).abs() < 1e-9);
        assert!(changes[0].at >= 2.0);
        assert!(changes[1].at - changes[0].at >= 2.0);
        assert_eq!(surface.pixel_ratio, dpr.current());
    }

    #[test]
    fn test_sustained_high_fps_caps_at_max() {
        let mut dpr = AdaptiveDpr::new(DprControllerConfig::default(), mid_range()).with_initial(1.0);
        let mut surface = RecordingSurface::default();

        for frame in frames(70.0, 0.0, 60.0) {
            dpr.on_frame(frame, &mut surface);
            assert!(mid_range().contains(dpr.current()));
        }
        assert_eq!(dpr.current(), 1.5);
        // Ten steps of 0.05, none past the cap.
        assert_eq!(surface.pixel_ratio_history.len(), 10);
        assert!(surface.pixel_ratio_history.iter().all(|r| *r <= 1.5));
    }

    #[test]
    fn test_low_fps_steps_down_to_min() {
        let mut dpr = AdaptiveDpr::new(DprControllerConfig::default(), mid_range());
        let mut surface = RecordingSurface::default();
        assert_eq!(dpr.current(), 1.5);

        for frame in frames(20.0, 0.0, 30.0) {
            dpr.on_frame(frame, &mut surface);
            assert!(mid_range().contains(dpr.current()));
        }
        assert_eq!(dpr.current(), 1.0);
        assert_eq!(surface.pixel_ratio_history.len(), 5);
    }

    #[test]
    fn test_cooldown_allows_one_adjustment() {
        let mut dpr = AdaptiveDpr::new(DprControllerConfig::default(), mid_range());
        let mut surface = RecordingSurface::default();

        // Two qualifying windows 1.5s apart.
        for frame in frames(20.0, 0.0, 3.0) {
            dpr.on_frame(frame, &mut surface);
        }
        let after_first = surface.pixel_ratio_history.len();
        let first_at = dpr.gate().last_adjustment();
        for frame in frames(20.0, 3.0, 0.5) {
            dpr.on_frame(frame, &mut surface);
        }

        assert_eq!(after_first, 1);
        assert_eq!(surface.pixel_ratio_history.len(), 1);
        assert!(3.5 - first_at < 2.0);
    }

    #[test]
    fn test_disabled_controller_is_inert() {
        let mut dpr = AdaptiveDpr::new(DprControllerConfig::default(), mid_range());
        let mut surface = RecordingSurface::default();
        dpr.set_enabled(false);

        for frame in frames(10.0, 0.0, 10.0) {
            assert!(dpr.on_frame(frame, &mut surface).is_none());
        }
        assert_eq!(dpr.gate().samples(), 0);
        assert_eq!(dpr.gate().last_adjustment(), 0.0);
        assert_eq!(dpr.current(), 1.5);

        dpr.set_enabled(true);
        let change = frames(10.0, 10.0, 3.0)
            .find_map(|frame| dpr.on_frame(frame, &mut surface))
            .expect("adjusts once the cooldown has elapsed");
        assert!(change.at >= 12.0);
    }

    #[test]
    fn test_single_hitch_after_resume_does_not_adjust() {
        let mut dpr = AdaptiveDpr::new(DprControllerConfig::default(), mid_range());
        let mut surface = RecordingSurface::default();

        for frame in frames(60.0, 0.0, 10.0) {
            assert!(dpr.on_frame(frame, &mut surface).is_none());
        }

        dpr.set_enabled(false);
        dpr.set_enabled(true);

        let hitch = FrameSample::new(20.0, 0.030);
        assert!(dpr.on_frame(hitch, &mut surface).is_none());
        assert_eq!(dpr.gate().samples(), 1);
        assert_eq!(dpr.gate().last_adjustment(), 20.0);
        assert_eq!(dpr.current(), 1.5);
        assert!(surface.pixel_ratio_history.is_empty());
    }

    #[test]
    fn test_reenable_starts_from_neutral_window() {
        let mut dpr = AdaptiveDpr::new(DprControllerConfig::default(), mid_range()).with_initial(1.2);
        let mut surface = RecordingSurface::default();

        for frame in frames(10.0, 0.0, 1.0) {
            dpr.on_frame(frame, &mut surface);
        }
        assert_eq!(dpr.gate().samples(), 10);

        dpr.set_enabled(false);
        dpr.set_enabled(true);
        assert_eq!(dpr.gate().samples(), 0);
    }

    #[test]
    fn test_begin_pushes_start_value() {
        let mut dpr = AdaptiveDpr::new(DprControllerConfig::default(), mid_range());
        let mut surface = RecordingSurface::default();
        dpr.begin(&mut surface);
        assert_eq!(surface.pixel_ratio, 1.5);
    }

    #[test]
    fn test_low_mode_hysteresis() {
        let mut low = AdaptiveLowMode::new(LowModeConfig::default());

        // Oscillating 45/50 sits inside the band and never flips.
        let mut t = 0.0;
        for i in 0..600 {
            let fps = if (i / 30) % 2 == 0 { 45.0 } else { 50.0 };
            t += 1.0 / fps;
            assert!(low.on_frame(FrameSample::new(t, 1.0 / fps)).is_none());
        }
        assert!(!low.is_low());

        let entered = frames(30.0, t, 3.0).find_map(|frame| low.on_frame(frame));
        assert_eq!(entered, Some(true));
        assert!(low.is_low());

        for frame in frames(50.0, t + 3.0, 3.0) {
            assert!(low.on_frame(frame).is_none());
        }

        let exited = frames(60.0, t + 6.0, 3.0).find_map(|frame| low.on_frame(frame));
        assert_eq!(exited, Some(false));
    }

    #[test]
    fn test_config_validation() {
        assert!(DprControllerConfig::default().validate().is_ok());
        assert!(LowModeConfig::default().validate().is_ok());

        let inverted = LowModeConfig {
            enter_fps: 60.0,
            exit_fps: 50.0,
            ..LowModeConfig::default()
        };
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::InvertedThresholds { enter: 60.0, exit: 50.0 })
        );

        let empty = DprControllerConfig {
            window: 0,
            ..DprControllerConfig::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::EmptyWindow { controller: "dpr" }));

        let zero_step = DprControllerConfig {
            step_up: 0.0,
            ..DprControllerConfig::default()
        };
        assert!(zero_step.validate().is_err());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: DprControllerConfig = serde_json::from_str(r#"{"target_fps": 60}"#).expect("json");
        assert_eq!(config.target_fps, 60.0);
        assert_eq!(config.step_down, 0.1);
        assert_eq!(config.window, DEFAULT_FPS_WINDOW);
    }
}
