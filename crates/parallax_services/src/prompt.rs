//! Notification and mode-toggle contracts
//!
//! Presentation lives elsewhere; these types hold the state the surfaces
//! need and funnel every user action into the settings context.

use crate::context::PerformanceHandle;
use crate::error::ContextError;
use crate::preference::{UserChoice, UserPreference};
use crate::settings::{PerformanceMode, PerformanceSettings};
use std::time::Duration;

/// How long the notification waits before appearing.
pub const NOTIFICATION_DELAY: Duration = Duration::from_secs(1);

/// Offer optimizations only to classified devices that need them and whose
/// user has not decided yet.
pub fn should_prompt(settings: &PerformanceSettings) -> bool {
    settings
        .capabilities
        .is_some_and(|caps| caps.tier.needs_optimization())
        && settings.preference == UserPreference::Unset
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotificationState {
    Pending,
    Visible,
    Dismissed,
}

/// "Performance optimizations available" prompt.
#[derive(Debug)]
pub struct PerformanceNotification {
    handle: PerformanceHandle,
    mounted_at: Duration,
    delay: Duration,
    state: NotificationState,
}

impl PerformanceNotification {
    pub fn new(handle: PerformanceHandle, mounted_at: Duration) -> Self {
        Self {
            handle,
            mounted_at,
            delay: NOTIFICATION_DELAY,
            state: NotificationState::Pending,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Advance to `now`; returns whether the prompt is showing.
    pub fn poll(&mut self, now: Duration) -> bool {
        if self.state == NotificationState::Pending
            && now.saturating_sub(self.mounted_at) >= self.delay
        {
            self.state = NotificationState::Visible;
        }
        self.is_visible()
    }

    pub fn is_visible(&self) -> bool {
        self.state == NotificationState::Visible
    }

    pub fn is_dismissed(&self) -> bool {
        self.state == NotificationState::Dismissed
    }

    pub fn on_accept(&mut self) -> Result<PerformanceSettings, ContextError> {
        self.resolve(UserChoice::Enabled)
    }

    /// Also used by the close button.
    pub fn on_ignore(&mut self) -> Result<PerformanceSettings, ContextError> {
        self.resolve(UserChoice::Ignored)
    }

    fn resolve(&mut self, choice: UserChoice) -> Result<PerformanceSettings, ContextError> {
        self.state = NotificationState::Dismissed;
        self.handle.set_user_choice(choice)
    }
}

/// High/low quality selector.
#[derive(Debug, Clone)]
pub struct PerformanceToggle {
    handle: PerformanceHandle,
}

impl PerformanceToggle {
    pub fn new(handle: PerformanceHandle) -> Self {
        Self { handle }
    }

    pub fn current_mode(&self) -> Result<PerformanceMode, ContextError> {
        Ok(self.handle.settings()?.mode())
    }

    pub fn on_mode_change(&self, mode: PerformanceMode) -> Result<PerformanceSettings, ContextError> {
        let choice = match mode {
            PerformanceMode::Low => UserChoice::Enabled,
            PerformanceMode::High => UserChoice::Ignored,
        };
        self.handle.set_user_choice(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PerformanceContext;
    use crate::preference::PreferenceStore;
    use parallax_env::{detect_capabilities, CapabilitySignals, DeviceCapabilities};

    fn caps(memory: Option<f64>, cores: usize) -> DeviceCapabilities {
        detect_capabilities(&CapabilitySignals {
            device_memory: memory,
            hardware_concurrency: Some(cores),
            ..CapabilitySignals::default()
        })
    }

    #[test]
    fn test_should_prompt_only_for_undecided_slow_devices() {
        let ctx = PerformanceContext::new(PreferenceStore::in_memory());
        assert!(!should_prompt(&ctx.settings()));

        ctx.initialize(caps(Some(2.0), 4));
        assert!(should_prompt(&ctx.settings()));

        ctx.set_user_choice(UserChoice::Ignored);
        assert!(!should_prompt(&ctx.settings()));

        let fast = PerformanceContext::new(PreferenceStore::in_memory());
        fast.initialize(caps(Some(32.0), 16));
        assert!(!should_prompt(&fast.settings()));
    }

    #[test]
    fn test_notification_appears_after_delay() {
        let ctx = PerformanceContext::new(PreferenceStore::in_memory());
        let mut notification = PerformanceNotification::new(ctx.handle(), Duration::from_millis(500));

        assert!(!notification.poll(Duration::from_millis(900)));
        assert!(notification.poll(Duration::from_millis(1500)));
    }

    #[test]
    fn test_accept_and_ignore_write_through() {
        let ctx = PerformanceContext::new(PreferenceStore::in_memory());
        ctx.initialize(caps(Some(32.0), 16));

        let mut notification = PerformanceNotification::new(ctx.handle(), Duration::ZERO);
        notification.poll(Duration::from_secs(2));
        let settings = notification.on_accept().expect("live context");
        assert!(notification.is_dismissed());
        assert!(!notification.poll(Duration::from_secs(3)));
        assert_eq!(settings.preference, UserPreference::Enabled);
        assert!(ctx.settings().performance_optimizations_enabled);

        let mut again = PerformanceNotification::new(ctx.handle(), Duration::ZERO);
        again.on_ignore().expect("live context");
        assert_eq!(ctx.settings().preference, UserPreference::Ignored);
        assert!(!ctx.settings().performance_optimizations_enabled);
    }

    #[test]
    fn test_toggle_maps_modes_to_choices() {
        let ctx = PerformanceContext::new(PreferenceStore::in_memory());
        ctx.initialize(caps(None, 4));
        let toggle = PerformanceToggle::new(ctx.handle());
        assert_eq!(toggle.current_mode(), Ok(PerformanceMode::Low));

        toggle.on_mode_change(PerformanceMode::High).expect("live context");
        assert_eq!(toggle.current_mode(), Ok(PerformanceMode::High));
        assert_eq!(ctx.settings().preference, UserPreference::Ignored);

        toggle.on_mode_change(PerformanceMode::Low).expect("live context");
        assert_eq!(toggle.current_mode(), Ok(PerformanceMode::Low));
    }

    #[test]
    fn test_toggle_outside_provider_fails() {
        let ctx = PerformanceContext::new(PreferenceStore::in_memory());
        let toggle = PerformanceToggle::new(ctx.handle());
        drop(ctx);
        assert_eq!(toggle.current_mode(), Err(ContextError::OutsideProvider));
    }
}
