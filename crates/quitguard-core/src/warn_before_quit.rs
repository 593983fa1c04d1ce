//! The hold-to-confirm quit (or close) gesture, as a termination decider.
//!
//! A [`WarnBeforeQuitManager`] is created for the key press that triggered
//! the quit. When asked, it tracks that press synchronously: a full hold
//! confirms, any other key or click cancels, and an early release switches
//! to waiting for a second press, which is asynchronous.
//!
//! Presentation is decoupled: the overlay subscribes to
//! [`WarnBeforeQuitState`] changes and reports pointer hover back through
//! [`WarnBeforeQuitManager::set_hovering`].

use crate::analytics::{
    ResolutionReason, WarnBeforeQuitAction, WarnBeforeQuitAnalytics, WarnBeforeQuitEvent,
};
use crate::config::WarnBeforeQuitOptions;
use crate::decision::{TerminationDecider, TerminationDecision, TerminationQuery};
use crate::event::InputEvent;
use crate::event_queue::SharedEventSource;
use crate::hold::{drain_key_release, HoldGestureDetector, HoldOutcome};
use crate::interceptor::InterceptorSlot;
use crate::preferences::WarnBeforeQuitPreferences;
use crate::second_press::{wait_for_second_press, HideawayControl, Resolution};
use crate::shortcut::Shortcut;
use crate::state::{Transition, WarnBeforeQuitState};
use futures::future::LocalBoxFuture;
use futures::stream::{BoxStream, StreamExt};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;

const STATE_CHANNEL_CAPACITY: usize = 16;

/// Everything the gesture needs from the surrounding application.
#[derive(Clone)]
pub struct QuitEnvironment {
    /// The UI thread's native event queue.
    pub events: SharedEventSource,
    /// The application-wide event interceptor.
    pub interceptors: InterceptorSlot,
    /// Where "warn before quitting" is stored.
    pub preferences: Rc<dyn WarnBeforeQuitPreferences>,
    /// Where outcomes are reported.
    pub analytics: Rc<dyn WarnBeforeQuitAnalytics>,
}

/// Drives one hold-to-confirm session and answers the termination chain.
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct WarnBeforeQuitManager {
    inner: Rc<ManagerInner>,
}

pub(crate) struct ManagerInner {
    pub(crate) action: WarnBeforeQuitAction,
    pub(crate) shortcut: Shortcut,
    pub(crate) options: WarnBeforeQuitOptions,
    pub(crate) env: QuitEnvironment,
    pub(crate) hideaway: watch::Sender<HideawayControl>,
    state: Cell<WarnBeforeQuitState>,
    states: broadcast::Sender<WarnBeforeQuitState>,
    key_still_down: Cell<bool>,
}

impl WarnBeforeQuitManager {
    /// A manager for `trigger`, or `None` if `trigger` is not a key-down of
    /// the action's shortcut with a non-empty modifier set.
    pub fn new(
        trigger: &InputEvent,
        action: WarnBeforeQuitAction,
        env: QuitEnvironment,
        options: WarnBeforeQuitOptions,
    ) -> Option<Self> {
        let shortcut = match action {
            WarnBeforeQuitAction::Quit => options.quit_shortcut,
            WarnBeforeQuitAction::CloseTab => options.close_shortcut,
        };
        let InputEvent::Key(key) = trigger else {
            return None;
        };
        if key.modifiers.is_empty() || !shortcut.matches_press(trigger) {
            tracing::debug!(?trigger, %shortcut, "trigger does not match guarded shortcut");
            return None;
        }

        let (states, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        let (hideaway, _) = watch::channel(HideawayControl::default());
        Some(Self {
            inner: Rc::new(ManagerInner {
                action,
                shortcut,
                options,
                env,
                hideaway,
                state: Cell::new(WarnBeforeQuitState::Idle),
                states,
                key_still_down: Cell::new(false),
            }),
        })
    }

    /// The guarded action.
    pub fn action(&self) -> WarnBeforeQuitAction {
        self.inner.action
    }

    /// The shortcut being tracked.
    pub fn shortcut(&self) -> Shortcut {
        self.inner.shortcut
    }

    /// The current session state.
    pub fn state(&self) -> WarnBeforeQuitState {
        self.inner.state()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> broadcast::Receiver<WarnBeforeQuitState> {
        self.inner.states.subscribe()
    }

    /// Subsequent state changes as a stream. Lagged updates are skipped.
    pub fn state_stream(&self) -> BoxStream<'static, WarnBeforeQuitState> {
        BroadcastStream::new(self.subscribe())
            .filter_map(|update| futures::future::ready(update.ok()))
            .boxed()
    }

    /// Report whether the pointer is over the prompt. While it is, the
    /// hideaway timer is suspended; leaving restarts it from zero.
    pub fn set_hovering(&self, hovering: bool) {
        self.inner.hideaway.send_if_modified(|control| {
            let changed = control.hovering != hovering;
            control.hovering = hovering;
            changed
        });
    }

    /// Return to [`Idle`](WarnBeforeQuitState::Idle) for another cycle.
    pub fn reset(&self) {
        self.inner.transition(Transition::Reset);
        self.inner.key_still_down.set(false);
        self.set_hovering(false);
    }

    /// Whether a confirming hold ended with the shortcut still down.
    pub fn key_still_down(&self) -> bool {
        self.inner.key_still_down.get()
    }

    /// If a confirming hold left the shortcut down, swallow events until it
    /// is released (bounded by the key-release timeout). Returns `true` if
    /// anything was drained.
    pub fn wait_for_key_release_if_needed(&self) -> bool {
        if !self.inner.key_still_down.replace(false) {
            return false;
        }
        let Ok(mut events) = self.inner.env.events.try_borrow_mut() else {
            tracing::warn!("event source busy; not draining key release");
            return false;
        };
        drain_key_release(
            &mut *events,
            self.inner.shortcut,
            self.inner.options.key_release_timeout,
        );
        true
    }

    /// A handler finish hook that drains the held shortcut once the chain
    /// decides to terminate.
    pub fn completion_hook(&self) -> impl FnOnce(bool) + 'static {
        let manager = self.clone();
        move |should_terminate| {
            if should_terminate {
                manager.wait_for_key_release_if_needed();
            }
        }
    }
}

impl TerminationDecider for WarnBeforeQuitManager {
    fn should_terminate(&mut self, is_async: bool) -> TerminationQuery {
        let inner = &self.inner;
        if is_async {
            tracing::debug!("termination already deferred; not warning");
            return TerminationQuery::next();
        }
        if !inner.env.preferences.is_warning_enabled() {
            return TerminationQuery::next();
        }
        if !inner.state().is_idle() {
            tracing::debug!(state = ?inner.state(), "session already used; not warning again");
            return TerminationQuery::next();
        }

        match inner.detect_hold() {
            HoldOutcome::Completed {
                should_proceed,
                key_still_down,
            } => {
                inner.key_still_down.set(should_proceed && key_still_down);
                let resolution = if should_proceed {
                    Resolution::proceed(ResolutionReason::HoldCompleted)
                } else {
                    Resolution::cancel(ResolutionReason::OtherInput)
                };
                inner.transition(Transition::Finished { should_proceed });
                let ack = inner.report(resolution);
                let decision = TerminationDecision::from_proceed(should_proceed);
                match inner.action {
                    WarnBeforeQuitAction::Quit => {
                        let timeout = inner.options.analytics_timeout;
                        TerminationQuery::deferred(async move {
                            settle_analytics(ack, timeout).await;
                            decision
                        })
                    }
                    WarnBeforeQuitAction::CloseTab => TerminationQuery::Sync(decision),
                }
            }
            HoldOutcome::ReleasedEarly { held_for, .. } => {
                tracing::debug!(?held_for, "released early; waiting for second press");
                inner.transition(Transition::ReleasedEarly);
                let inner = inner.clone();
                TerminationQuery::deferred(async move {
                    let resolution = wait_for_second_press(inner.clone()).await;
                    let ack = inner.report(resolution);
                    if inner.action == WarnBeforeQuitAction::Quit {
                        settle_analytics(ack, inner.options.analytics_timeout).await;
                    }
                    TerminationDecision::from_proceed(resolution.proceed)
                })
            }
        }
    }

    fn name(&self) -> &str {
        "WarnBeforeQuit"
    }
}

impl ManagerInner {
    pub(crate) fn state(&self) -> WarnBeforeQuitState {
        self.state.get()
    }

    /// Apply `transition`, publishing the new state. Illegal edges are
    /// logged and ignored.
    pub(crate) fn transition(&self, transition: Transition) -> bool {
        let current = self.state.get();
        let Some(next) = current.apply(transition) else {
            tracing::warn!(state = ?current, ?transition, "ignoring illegal transition");
            return false;
        };
        self.state.set(next);
        tracing::trace!(from = ?current, to = ?next, "warn-before-quit state");
        // No subscribers is fine.
        let _ = self.states.send(next);
        true
    }

    pub(crate) fn detect_hold(&self) -> HoldOutcome {
        let Ok(mut events) = self.env.events.try_borrow_mut() else {
            tracing::warn!("event source busy; treating press as interrupted");
            return HoldOutcome::Completed {
                should_proceed: false,
                key_still_down: false,
            };
        };
        HoldGestureDetector::new(self.shortcut, &self.options).detect(&mut *events, &mut |t| {
            self.transition(t);
        })
    }

    pub(crate) fn set_key_still_down(&self, down: bool) {
        self.key_still_down.set(down);
    }

    pub(crate) fn rearm_hideaway(&self) {
        self.hideaway
            .send_modify(|control| control.generation = control.generation.wrapping_add(1));
    }

    fn report(&self, resolution: Resolution) -> LocalBoxFuture<'static, ()> {
        tracing::info!(
            action = ?self.action,
            proceeded = resolution.proceed,
            reason = ?resolution.reason,
            "warn-before-quit resolved"
        );
        self.env.analytics.record(WarnBeforeQuitEvent {
            action: self.action,
            proceeded: resolution.proceed,
            reason: resolution.reason,
        })
    }
}

async fn settle_analytics(ack: LocalBoxFuture<'static, ()>, timeout: Duration) {
    if tokio::time::timeout(timeout, ack).await.is_err() {
        tracing::debug!(?timeout, "analytics acknowledgment timed out");
    }
}
