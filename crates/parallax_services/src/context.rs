//! Performance settings context
//!
//! [`PerformanceContext`] is the provider: it owns the state for the life
//! of the process and is constructed explicitly at startup. Consumers get a
//! [`PerformanceHandle`], and the two per-frame controllers claim the
//! single [`DprWriter`] / [`LowModeWriter`] for the fields they own.
//!
//! Write access per field:
//!
//! | field                        | writer                    |
//! |------------------------------|---------------------------|
//! | preference, derived flags    | the context itself        |
//! | `current_dpr`                | the claimed `DprWriter`   |
//! | `low_mode`                   | the claimed `LowModeWriter` |

use crate::error::ContextError;
use crate::observer::{Listeners, Subscription};
use crate::preference::{PreferenceStore, UserChoice, UserPreference};
use crate::settings::{PerformanceSettings, INITIAL_DPR};
use parallax_env::DeviceCapabilities;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

const DPR_EPSILON: f64 = 1e-9;

struct ContextState {
    capabilities: Option<DeviceCapabilities>,
    preference: UserPreference,
    current_dpr: f64,
    low_mode: bool,
    settings: PerformanceSettings,
}

struct ContextInner {
    state: RefCell<ContextState>,
    store: PreferenceStore,
    listeners: Listeners<PerformanceSettings>,
    dpr_writer_claimed: Cell<bool>,
    low_mode_writer_claimed: Cell<bool>,
}

impl ContextInner {
    fn settings(&self) -> PerformanceSettings {
        self.state.borrow().settings
    }

    /// Derive a fresh settings value and publish it.
    fn recompute(&self) -> PerformanceSettings {
        let settings = {
            let mut state = self.state.borrow_mut();
            let next = PerformanceSettings::derive(
                state.capabilities.as_ref(),
                state.preference,
                state.current_dpr,
                state.low_mode,
                state.settings.version + 1,
            );
            state.current_dpr = next.current_dpr;
            state.settings = next;
            next
        };
        self.listeners.notify(&settings);
        settings
    }

    fn initialize(&self, capabilities: DeviceCapabilities) -> bool {
        if self.state.borrow().capabilities.is_some() {
            tracing::warn!("performance context already initialized, ignoring new capabilities");
            return false;
        }

        let preference = self.store.load();
        {
            let mut state = self.state.borrow_mut();
            state.capabilities = Some(capabilities);
            state.preference = preference;
        }
        let settings = self.recompute();
        tracing::info!(
            tier = ?capabilities.tier,
            %preference,
            optimized = settings.performance_optimizations_enabled,
            dpr_min = settings.dpr_range.min,
            dpr_max = settings.dpr_range.max,
            "performance settings initialized"
        );
        true
    }

    fn set_user_choice(&self, choice: UserChoice) -> PerformanceSettings {
        self.store.save(choice);
        self.state.borrow_mut().preference = choice.into();
        let settings = self.recompute();
        tracing::info!(
            preference = %settings.preference,
            optimized = settings.performance_optimizations_enabled,
            "performance preference changed"
        );
        settings
    }

    fn toggle_optimizations(&self) -> PerformanceSettings {
        let choice = if self.settings().performance_optimizations_enabled {
            UserChoice::Ignored
        } else {
            UserChoice::Enabled
        };
        self.set_user_choice(choice)
    }

    fn set_current_dpr(&self, value: f64) -> f64 {
        let clamped = {
            let mut state = self.state.borrow_mut();
            let clamped = state.settings.dpr_range.clamp(value);
            if (clamped - state.current_dpr).abs() < DPR_EPSILON {
                return clamped;
            }
            state.current_dpr = clamped;
            clamped
        };
        self.recompute();
        clamped
    }

    fn set_low_mode(&self, low_mode: bool) {
        {
            let mut state = self.state.borrow_mut();
            if state.low_mode == low_mode {
                return;
            }
            state.low_mode = low_mode;
        }
        self.recompute();
    }
}

/// The provider. Dropping it invalidates every handle and writer.
pub struct PerformanceContext {
    inner: Rc<ContextInner>,
}

impl PerformanceContext {
    /// Start in the "unknown device" state, presenting full-quality defaults.
    pub fn new(store: PreferenceStore) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                state: RefCell::new(ContextState {
                    capabilities: None,
                    preference: UserPreference::Unset,
                    current_dpr: INITIAL_DPR,
                    low_mode: false,
                    settings: PerformanceSettings::unknown(),
                }),
                store,
                listeners: Listeners::new(),
                dpr_writer_claimed: Cell::new(false),
                low_mode_writer_claimed: Cell::new(false),
            }),
        }
    }

    /// Move from "unknown" to "known". Happens once; later calls return
    /// `false` and change nothing.
    pub fn initialize(&self, capabilities: DeviceCapabilities) -> bool {
        self.inner.initialize(capabilities)
    }

    pub fn settings(&self) -> PerformanceSettings {
        self.inner.settings()
    }

    pub fn set_user_choice(&self, choice: UserChoice) -> PerformanceSettings {
        self.inner.set_user_choice(choice)
    }

    pub fn toggle_optimizations(&self) -> PerformanceSettings {
        self.inner.toggle_optimizations()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&PerformanceSettings) + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    pub fn handle(&self) -> PerformanceHandle {
        PerformanceHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn claim_dpr_writer(&self) -> Result<DprWriter, ContextError> {
        self.handle().claim_dpr_writer()
    }

    pub fn claim_low_mode_writer(&self) -> Result<LowModeWriter, ContextError> {
        self.handle().claim_low_mode_writer()
    }
}

impl std::fmt::Debug for PerformanceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceContext")
            .field("settings", &self.inner.settings())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

/// Consumer-side access to a [`PerformanceContext`].
///
/// Every call fails with [`ContextError::OutsideProvider`] once the
/// provider is gone.
#[derive(Debug, Clone)]
pub struct PerformanceHandle {
    inner: Weak<ContextInner>,
}

impl PerformanceHandle {
    fn upgrade(&self) -> Result<Rc<ContextInner>, ContextError> {
        self.inner.upgrade().ok_or(ContextError::OutsideProvider)
    }

    pub fn settings(&self) -> Result<PerformanceSettings, ContextError> {
        Ok(self.upgrade()?.settings())
    }

    pub fn set_user_choice(&self, choice: UserChoice) -> Result<PerformanceSettings, ContextError> {
        Ok(self.upgrade()?.set_user_choice(choice))
    }

    pub fn toggle_optimizations(&self) -> Result<PerformanceSettings, ContextError> {
        Ok(self.upgrade()?.toggle_optimizations())
    }

    pub fn subscribe<F>(&self, listener: F) -> Result<Subscription, ContextError>
    where
        F: FnMut(&PerformanceSettings) + 'static,
    {
        Ok(self.upgrade()?.listeners.subscribe(listener))
    }

    pub fn claim_dpr_writer(&self) -> Result<DprWriter, ContextError> {
        let inner = self.upgrade()?;
        if inner.dpr_writer_claimed.replace(true) {
            return Err(ContextError::WriterClaimed { field: "current_dpr" });
        }
        Ok(DprWriter {
            inner: self.inner.clone(),
        })
    }

    pub fn claim_low_mode_writer(&self) -> Result<LowModeWriter, ContextError> {
        let inner = self.upgrade()?;
        if inner.low_mode_writer_claimed.replace(true) {
            return Err(ContextError::WriterClaimed { field: "low_mode" });
        }
        Ok(LowModeWriter {
            inner: self.inner.clone(),
        })
    }
}

/// Sole write access to `current_dpr`. Released on drop.
#[derive(Debug)]
pub struct DprWriter {
    inner: Weak<ContextInner>,
}

impl DprWriter {
    /// Publish a new DPR, clamped into the current range. Not persisted.
    pub fn set(&self, value: f64) -> Result<f64, ContextError> {
        let inner = self.inner.upgrade().ok_or(ContextError::OutsideProvider)?;
        Ok(inner.set_current_dpr(value))
    }
}

impl Drop for DprWriter {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.dpr_writer_claimed.set(false);
        }
    }
}

/// Sole write access to `low_mode`. Released on drop.
#[derive(Debug)]
pub struct LowModeWriter {
    inner: Weak<ContextInner>,
}

impl LowModeWriter {
    pub fn set(&self, low_mode: bool) -> Result<(), ContextError> {
        let inner = self.inner.upgrade().ok_or(ContextError::OutsideProvider)?;
        inner.set_low_mode(low_mode);
        Ok(())
    }
}

impl Drop for LowModeWriter {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.low_mode_writer_claimed.set(false);
        }
    }
}
