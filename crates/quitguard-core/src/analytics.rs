//! Telemetry for the warn-before-quit gesture.

use futures::future::LocalBoxFuture;
use futures::FutureExt;

/// What the gesture was guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarnBeforeQuitAction {
    /// Quitting the application.
    Quit,
    /// Closing a (pinned) tab or window.
    CloseTab,
}

/// Why a warn-before-quit session ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionReason {
    /// The shortcut was held for the full duration.
    HoldCompleted,
    /// A quick second tap confirmed.
    QuickTap,
    /// A click landed while the warning had been switched off.
    WarningDisabled,
    /// The hideaway timer expired.
    Timeout,
    /// Escape was pressed.
    Escape,
    /// The user clicked elsewhere.
    ClickOutside,
    /// Another key or a click interrupted the gesture.
    OtherInput,
    /// Another owner held the event interceptor.
    InterceptorBusy,
    /// The waiting task was cancelled.
    Cancelled,
}

/// One completed warn-before-quit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarnBeforeQuitEvent {
    /// The guarded action.
    pub action: WarnBeforeQuitAction,
    /// Whether the action went ahead.
    pub proceeded: bool,
    /// What settled it.
    pub reason: ResolutionReason,
}

/// Fire-and-forget sink for gesture outcomes.
///
/// The returned future completes when the event has been handed off. Callers
/// may drop it unawaited, or await it under a timeout; it must never be
/// awaited without a bound.
pub trait WarnBeforeQuitAnalytics {
    /// Record `event`.
    fn record(&self, event: WarnBeforeQuitEvent) -> LocalBoxFuture<'static, ()>;
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

impl WarnBeforeQuitAnalytics for NoopAnalytics {
    fn record(&self, _event: WarnBeforeQuitEvent) -> LocalBoxFuture<'static, ()> {
        async {}.boxed_local()
    }
}
