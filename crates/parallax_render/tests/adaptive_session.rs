//! A render session wired the way the runtime wires it: context, writers,
//! controllers, a surface and the frame scheduler.

use parallax_env::{detect_capabilities, CapabilitySignals, DeviceCapabilities};
use parallax_metrics::FrameSample;
use parallax_render::{
    AdaptiveDpr, AdaptiveLowMode, DprControllerConfig, FrameScheduler, LowModeConfig,
    PixelRatioTarget, RecordingSurface, RenderParameters, RenderSurface, VisibilityGate,
};
use parallax_services::{PerformanceContext, PreferenceStore, UserChoice};
use std::cell::RefCell;
use std::rc::Rc;

fn mid_tier() -> DeviceCapabilities {
    detect_capabilities(&CapabilitySignals {
        hardware_concurrency: Some(4),
        device_pixel_ratio: Some(1.0),
        ..CapabilitySignals::default()
    })
}

fn run(scheduler: &FrameScheduler, fps: f64, start: f64, seconds: f64) -> f64 {
    let delta = 1.0 / fps;
    let count = (seconds * fps).round() as usize;
    for i in 1..=count {
        scheduler.dispatch(FrameSample::new(start + i as f64 * delta, delta));
    }
    start + count as f64 * delta
}

#[test]
fn dpr_controller_keeps_surface_and_context_in_step() {
    let ctx = PerformanceContext::new(PreferenceStore::in_memory());
    ctx.initialize(mid_tier());
    let settings = ctx.settings();

    let surface = Rc::new(RefCell::new(RecordingSurface::default()));
    let dpr = Rc::new(RefCell::new(
        AdaptiveDpr::new(DprControllerConfig::default(), settings.dpr_range)
            .with_initial(1.0)
            .with_writer(ctx.claim_dpr_writer().expect("claim")),
    ));
    dpr.borrow_mut().begin(&mut *surface.borrow_mut());

    let scheduler = FrameScheduler::new();
    let _frame_sub = {
        let dpr = Rc::clone(&dpr);
        let surface = Rc::clone(&surface);
        scheduler.subscribe(move |frame| {
            dpr.borrow_mut().on_frame(*frame, &mut *surface.borrow_mut());
        })
    };

    run(&scheduler, 70.0, 0.0, 5.5);

    let current = dpr.borrow().current();
    assert!((current - 1.10).abs() < 1e-9);
    assert_eq!(surface.borrow().pixel_ratio(), current);
    assert_eq!(ctx.settings().current_dpr, current);
    // The DPR writer never touches the user's decision.
    assert!(ctx.settings().performance_optimizations_enabled);
}

#[test]
fn unmounted_session_stops_adjusting() {
    let ctx = PerformanceContext::new(PreferenceStore::in_memory());
    ctx.initialize(mid_tier());

    let surface = Rc::new(RefCell::new(RecordingSurface::default()));
    let dpr = Rc::new(RefCell::new(
        AdaptiveDpr::new(DprControllerConfig::default(), ctx.settings().dpr_range)
            .with_writer(ctx.claim_dpr_writer().expect("claim")),
    ));

    let scheduler = FrameScheduler::new();
    let frame_sub = {
        let dpr = Rc::clone(&dpr);
        let surface = Rc::clone(&surface);
        scheduler.subscribe(move |frame| {
            dpr.borrow_mut().on_frame(*frame, &mut *surface.borrow_mut());
        })
    };

    let t = run(&scheduler, 20.0, 0.0, 2.5);
    let adjusted = surface.borrow().pixel_ratio_history.len();
    assert_eq!(adjusted, 1);

    drop(frame_sub);
    run(&scheduler, 20.0, t, 20.0);
    assert_eq!(surface.borrow().pixel_ratio_history.len(), adjusted);

    // Tearing the controller down releases the writer for the next session.
    drop(dpr);
    assert!(ctx.claim_dpr_writer().is_ok());
}

#[test]
fn hidden_surface_pauses_controllers() {
    let ctx = PerformanceContext::new(PreferenceStore::in_memory());
    ctx.initialize(mid_tier());

    let mut low = AdaptiveLowMode::new(LowModeConfig::default())
        .with_writer(ctx.claim_low_mode_writer().expect("claim"));
    let mut gate = VisibilityGate::default();

    if let Some(visible) = gate.set_document_visible(false) {
        low.set_enabled(visible);
    }

    for i in 1..=300 {
        let frame = FrameSample::new(i as f64 * 0.05, 0.05);
        assert!(low.on_frame(frame).is_none());
    }
    assert!(!ctx.settings().low_mode);

    if let Some(visible) = gate.set_document_visible(true) {
        low.set_enabled(visible);
    }
    let flipped = (301..=400)
        .map(|i| FrameSample::new(i as f64 * 0.05, 0.05))
        .find_map(|frame| low.on_frame(frame));
    assert_eq!(flipped, Some(true));
    assert!(ctx.settings().low_mode);
}

#[test]
fn user_choice_flows_into_render_parameters() {
    let ctx = PerformanceContext::new(PreferenceStore::in_memory());
    let surface = Rc::new(RefCell::new(RecordingSurface::default()));

    let _settings_sub = {
        let surface = Rc::clone(&surface);
        ctx.subscribe(move |settings| {
            surface
                .borrow_mut()
                .apply_quality(&RenderParameters::from_settings(settings));
        })
    };

    ctx.initialize(mid_tier());
    let optimized = surface.borrow().quality.expect("applied");
    assert!(!optimized.antialiasing);
    assert!(optimized.post_processing);

    ctx.set_user_choice(UserChoice::Ignored);
    let full = surface.borrow().quality.expect("applied");
    assert!(full.antialiasing);
    assert!(!full.shadows);
}
