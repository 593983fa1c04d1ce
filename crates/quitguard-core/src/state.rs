//! The warn-before-quit session state machine.

use std::time::{Duration, Instant};

/// Where a warn-before-quit session currently stands.
///
/// Presentation layers subscribe to these states to show, animate and hide
/// the confirmation overlay; the state machine itself renders nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarnBeforeQuitState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// The shortcut is down but not yet confirmed as a hold.
    KeyDown,
    /// Progress is animating toward the required hold duration.
    Holding {
        /// When the visible progress started.
        started_at: Instant,
        /// When the progress animation reaches its end.
        target_time: Instant,
    },
    /// Released early; waiting for a second press, Escape, a click or the
    /// hideaway timeout.
    WaitingForSecondPress,
    /// Terminal for this cycle.
    Completed {
        /// Whether termination should proceed.
        should_proceed: bool,
    },
}

/// An input to [`WarnBeforeQuitState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The shortcut was pressed.
    Press,
    /// The press outlasted the progress threshold.
    HoldStarted {
        /// Start of the visible progress.
        started_at: Instant,
        /// End of the progress animation.
        target_time: Instant,
    },
    /// The shortcut or its modifiers were released before the hold completed.
    ReleasedEarly,
    /// The session reached a verdict.
    Finished {
        /// Whether termination should proceed.
        should_proceed: bool,
    },
    /// Start a new cycle.
    Reset,
}

impl WarnBeforeQuitState {
    /// The state reached by applying `transition`, or `None` if the edge is
    /// not part of the machine.
    pub fn apply(self, transition: Transition) -> Option<Self> {
        use Transition as T;
        use WarnBeforeQuitState as S;
        match (self, transition) {
            (_, T::Reset) => Some(S::Idle),
            (S::Idle | S::WaitingForSecondPress, T::Press) => Some(S::KeyDown),
            (S::KeyDown, T::HoldStarted { started_at, target_time }) => {
                Some(S::Holding { started_at, target_time })
            }
            (S::KeyDown | S::Holding { .. }, T::ReleasedEarly) => Some(S::WaitingForSecondPress),
            (S::KeyDown | S::Holding { .. } | S::WaitingForSecondPress, T::Finished { should_proceed }) => {
                Some(S::Completed { should_proceed })
            }
            _ => None,
        }
    }

    /// Whether no session is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self, WarnBeforeQuitState::Idle)
    }

    /// Whether the session has reached its verdict.
    pub fn is_completed(&self) -> bool {
        matches!(self, WarnBeforeQuitState::Completed { .. })
    }

    /// Total animation length while [`Holding`](WarnBeforeQuitState::Holding).
    pub fn hold_duration(&self) -> Option<Duration> {
        match self {
            WarnBeforeQuitState::Holding { started_at, target_time } => {
                Some(target_time.saturating_duration_since(*started_at))
            }
            _ => None,
        }
    }

    /// Hold progress in `0.0..=1.0` at `now`, while holding.
    pub fn progress_at(&self, now: Instant) -> Option<f64> {
        let WarnBeforeQuitState::Holding { started_at, .. } = self else {
            return None;
        };
        let total = self.hold_duration()?.as_secs_f64();
        if total <= f64::EPSILON {
            return Some(1.0);
        }
        let elapsed = now.saturating_duration_since(*started_at).as_secs_f64();
        Some((elapsed / total).clamp(0.0, 1.0))
    }
}
