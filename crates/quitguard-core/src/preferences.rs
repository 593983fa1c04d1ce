//! Preference contracts consumed by the deciders.
//!
//! Persistence is the embedding application's concern; the pipeline only
//! reads (and, for "don't ask again" and the auto-clear bookkeeping flag,
//! writes) a handful of booleans.

use std::cell::Cell;

/// Preferences read by the warn-before-quit gesture.
pub trait WarnBeforeQuitPreferences {
    /// Whether quitting (or closing) should require the hold gesture.
    fn is_warning_enabled(&self) -> bool;

    /// Change the setting, e.g. from a "don't ask again" affordance.
    fn set_warning_enabled(&self, enabled: bool);
}

/// Preferences read by the auto-clear-on-quit decider.
pub trait AutoClearPreferences {
    /// Whether browsing data is cleared on quit.
    fn is_auto_clear_enabled(&self) -> bool;

    /// Whether the user is asked before clearing.
    fn is_warn_before_clearing_enabled(&self) -> bool;

    /// Whether the previous termination finished its clearing work.
    fn termination_handled_correctly(&self) -> bool;

    /// Record whether the current termination finished its clearing work.
    fn set_termination_handled_correctly(&self, handled: bool);
}

/// Process-local preferences, for tests and demos.
#[derive(Debug)]
pub struct InMemoryPreferences {
    warning_enabled: Cell<bool>,
    auto_clear_enabled: Cell<bool>,
    warn_before_clearing: Cell<bool>,
    termination_handled: Cell<bool>,
}

impl Default for InMemoryPreferences {
    fn default() -> Self {
        Self {
            warning_enabled: Cell::new(true),
            auto_clear_enabled: Cell::new(false),
            warn_before_clearing: Cell::new(false),
            termination_handled: Cell::new(true),
        }
    }
}

impl InMemoryPreferences {
    /// Warning on, auto-clear off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the quit warning is enabled.
    pub fn with_warning(self, enabled: bool) -> Self {
        self.warning_enabled.set(enabled);
        self
    }

    /// Set whether auto-clear runs, and whether it asks first.
    pub fn with_auto_clear(self, enabled: bool, warn_first: bool) -> Self {
        self.auto_clear_enabled.set(enabled);
        self.warn_before_clearing.set(warn_first);
        self
    }

    /// Turn auto-clear on or off in place.
    pub fn set_auto_clear_enabled(&self, enabled: bool) {
        self.auto_clear_enabled.set(enabled);
    }
}

impl WarnBeforeQuitPreferences for InMemoryPreferences {
    fn is_warning_enabled(&self) -> bool {
        self.warning_enabled.get()
    }

    fn set_warning_enabled(&self, enabled: bool) {
        self.warning_enabled.set(enabled);
    }
}

impl AutoClearPreferences for InMemoryPreferences {
    fn is_auto_clear_enabled(&self) -> bool {
        self.auto_clear_enabled.get()
    }

    fn is_warn_before_clearing_enabled(&self) -> bool {
        self.warn_before_clearing.get()
    }

    fn termination_handled_correctly(&self) -> bool {
        self.termination_handled.get()
    }

    fn set_termination_handled_correctly(&self, handled: bool) {
        self.termination_handled.set(handled);
    }
}
