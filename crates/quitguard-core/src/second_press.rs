//! Waiting for the confirming second press after an early release.
//!
//! Four things can settle the wait: a second press of the shortcut (seen by
//! an interceptor hook), Escape, a click, or the hideaway timer. They all
//! race to resolve one [`Resolver`]; the first wins.

use crate::analytics::ResolutionReason;
use crate::event::InputEvent;
use crate::hold::HoldOutcome;
use crate::interceptor::{InterceptHook, OwnerToken};
use crate::promise::{self, Resolver};
use crate::state::Transition;
use crate::warn_before_quit::ManagerInner;
use crossterm::event::{KeyEventKind, MouseEventKind};
use std::rc::{Rc, Weak};
use tokio::sync::mpsc;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub(crate) proceed: bool,
    pub(crate) reason: ResolutionReason,
}

impl Resolution {
    pub(crate) fn proceed(reason: ResolutionReason) -> Self {
        Self { proceed: true, reason }
    }

    pub(crate) fn cancel(reason: ResolutionReason) -> Self {
        Self { proceed: false, reason }
    }
}

/// Hideaway timer control, published by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct HideawayControl {
    /// The pointer is over the prompt; the timer is suspended.
    pub(crate) hovering: bool,
    /// Bumped to restart the timer from zero.
    pub(crate) generation: u64,
}

/// Releases the interceptor when the wait ends, however it ends.
struct Teardown {
    inner: Rc<ManagerInner>,
    token: OwnerToken,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.inner.env.interceptors.release(Some(self.token));
        if !self.inner.state().is_completed() {
            tracing::debug!("second-press wait dropped before resolving");
            self.inner.transition(Transition::Finished { should_proceed: false });
        }
    }
}

/// Wait in `WaitingForSecondPress` until something settles the session,
/// then apply the verdict.
pub(crate) async fn wait_for_second_press(inner: Rc<ManagerInner>) -> Resolution {
    let (resolver, mut settled) = promise::pending::<Resolution>();
    let (clicks_tx, mut clicks) = mpsc::unbounded_channel::<()>();

    let token = OwnerToken::new();
    let hook = intercept(Rc::downgrade(&inner), resolver.clone(), clicks_tx);
    if !inner.env.interceptors.acquire(token, hook) {
        tracing::warn!(
            owner = ?inner.env.interceptors.owner(),
            "event interceptor already installed; cancelling"
        );
        inner.transition(Transition::Finished { should_proceed: false });
        return Resolution::cancel(ResolutionReason::InterceptorBusy);
    }
    let _teardown = Teardown {
        inner: inner.clone(),
        token,
    };

    let hideaway = inner.options.hideaway_duration;
    let mut control = inner.hideaway.subscribe();
    let mut armed = !control.borrow_and_update().hovering;
    let mut control_open = true;
    let timer = tokio::time::sleep(hideaway);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;

            outcome = &mut settled => {
                let resolution = outcome.unwrap_or(Resolution::cancel(ResolutionReason::Cancelled));
                inner.transition(Transition::Finished { should_proceed: resolution.proceed });
                return resolution;
            }
            Some(()) = clicks.recv() => {
                // Handled a turn late so a "don't ask again" click has
                // already updated the preference.
                let resolution = if inner.env.preferences.is_warning_enabled() {
                    Resolution::cancel(ResolutionReason::ClickOutside)
                } else {
                    Resolution::proceed(ResolutionReason::WarningDisabled)
                };
                resolver.resolve(resolution);
            }
            changed = control.changed(), if control_open => {
                if changed.is_err() {
                    control_open = false;
                    continue;
                }
                let current = *control.borrow_and_update();
                if current.hovering {
                    tracing::trace!("hideaway timer suspended");
                    armed = false;
                } else {
                    tracing::trace!(?hideaway, "hideaway timer restarted");
                    armed = true;
                    timer.as_mut().reset(tokio::time::Instant::now() + hideaway);
                }
            }
            () = &mut timer, if armed => {
                armed = false;
                resolver.resolve(Resolution::cancel(ResolutionReason::Timeout));
            }
        }
    }
}

fn intercept(
    inner: Weak<ManagerInner>,
    resolver: Resolver<Resolution>,
    clicks: mpsc::UnboundedSender<()>,
) -> InterceptHook {
    Box::new(move |event| {
        let Some(inner) = inner.upgrade() else {
            return Some(event);
        };
        if resolver.is_resolved() {
            return Some(event);
        }
        if event.is_escape_press() {
            resolver.resolve(Resolution::cancel(ResolutionReason::Escape));
            return None;
        }
        if inner.shortcut.matches_press(&event) {
            on_second_press(&inner, &resolver);
            return None;
        }
        if inner.shortcut.matches_repeat(&event) {
            return None;
        }
        match &event {
            InputEvent::Key(key) if key.kind == KeyEventKind::Press => {
                resolver.resolve(Resolution::cancel(ResolutionReason::OtherInput));
            }
            InputEvent::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                let _ = clicks.send(());
            }
            _ => {}
        }
        Some(event)
    })
}

fn on_second_press(inner: &ManagerInner, resolver: &Resolver<Resolution>) {
    match inner.detect_hold() {
        HoldOutcome::Completed {
            should_proceed: true,
            key_still_down,
        } => {
            inner.set_key_still_down(key_still_down);
            resolver.resolve(Resolution::proceed(ResolutionReason::HoldCompleted));
        }
        HoldOutcome::Completed { .. } => {
            resolver.resolve(Resolution::cancel(ResolutionReason::OtherInput));
        }
        HoldOutcome::ReleasedEarly { held_for, .. } if held_for <= inner.options.quick_tap_window() => {
            resolver.resolve(Resolution::proceed(ResolutionReason::QuickTap));
        }
        HoldOutcome::ReleasedEarly { held_for, .. } => {
            tracing::debug!(?held_for, "second press released early; waiting again");
            inner.transition(Transition::ReleasedEarly);
            inner.rearm_hideaway();
        }
    }
}
