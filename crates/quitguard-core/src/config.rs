use crate::shortcut::Shortcut;
use std::time::Duration;

/// Timing and shortcut configuration for the warn-before-quit gesture.
///
/// All fields have sensible defaults (see [`Default`] impl). Use struct
/// update syntax to override only the options you need:
///
/// # Example
///
/// ```
/// use quitguard_core::{Shortcut, WarnBeforeQuitOptions};
/// use std::time::Duration;
///
/// let opts = WarnBeforeQuitOptions {
///     quit_shortcut: Shortcut::ctrl('q'),
///     hideaway_duration: Duration::from_secs(2),
///     ..WarnBeforeQuitOptions::default()
/// };
/// assert_eq!(opts.required_hold_duration, Duration::from_millis(600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarnBeforeQuitOptions {
    /// How long the shortcut must stay down before progress becomes visible
    /// (default: 100 ms).
    pub progress_threshold: Duration,
    /// How long the shortcut must be held, after the threshold, to confirm
    /// (default: 600 ms).
    pub required_hold_duration: Duration,
    /// Extra time added to the progress animation's end so it visibly
    /// completes before the verdict lands (default: 50 ms).
    pub hold_animation_buffer: Duration,
    /// A second press released within `progress_threshold` plus this buffer
    /// counts as a confirming tap (default: 50 ms).
    pub quick_tap_buffer: Duration,
    /// How long the "press again" prompt waits before cancelling
    /// (default: 4 s).
    pub hideaway_duration: Duration,
    /// Cap on waiting for a held shortcut to be released after confirming
    /// (default: 3 s).
    pub key_release_timeout: Duration,
    /// Cap on waiting for the analytics acknowledgment before quitting
    /// (default: 500 ms).
    pub analytics_timeout: Duration,
    /// Shortcut guarded for quitting (default: ⌘Q).
    pub quit_shortcut: Shortcut,
    /// Shortcut guarded for closing a tab or window (default: ⌘W).
    pub close_shortcut: Shortcut,
}

impl Default for WarnBeforeQuitOptions {
    fn default() -> Self {
        Self {
            progress_threshold: Duration::from_millis(100),
            required_hold_duration: Duration::from_millis(600),
            hold_animation_buffer: Duration::from_millis(50),
            quick_tap_buffer: Duration::from_millis(50),
            hideaway_duration: Duration::from_secs(4),
            key_release_timeout: Duration::from_secs(3),
            analytics_timeout: Duration::from_millis(500),
            quit_shortcut: Shortcut::cmd('q'),
            close_shortcut: Shortcut::cmd('w'),
        }
    }
}

impl WarnBeforeQuitOptions {
    /// Longest second-press duration still treated as a confirming tap.
    pub fn quick_tap_window(&self) -> Duration {
        self.progress_threshold + self.quick_tap_buffer
    }
}
