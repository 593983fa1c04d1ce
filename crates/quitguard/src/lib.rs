//! **quitguard** -- hold-to-confirm quitting and termination decider chains.
//!
//! This is the umbrella crate that re-exports everything from a single
//! dependency:
//!
//! ```toml
//! [dependencies]
//! quitguard = "0.1"
//! ```
//!
//! # Re-exports
//!
//! * All public items from [`quitguard_core`] are available at the crate root
//!   ([`TerminationDeciderHandler`], [`TerminationChain`],
//!   [`WarnBeforeQuitManager`], [`AutoClearHandler`], etc.).
//! * The [`widgets`] module re-exports [`quitguard_widgets`].
//! * [`ratatui`], [`crossterm`], and [`tokio`] are re-exported so downstream
//!   crates do not need to depend on them directly.
//!
//! # Quick start
//!
//! ```ignore
//! use quitguard::chain::{DeciderSlot, TerminationChain};
//! use quitguard::{TerminationDecider, TerminationDeciderHandler, WarnBeforeQuitManager};
//!
//! // On ⌘Q, build a fresh chain for this attempt.
//! let manager = WarnBeforeQuitManager::new(&event, WarnBeforeQuitAction::Quit, env, options)?;
//! handler.on_finish(manager.completion_hook());
//! let reply = handler.execute_deciders(
//!     TerminationChain::new()
//!         .with(DeciderSlot::WarnBeforeQuit, manager)
//!         .with(DeciderSlot::AutoClear, auto_clear.clone())
//!         .build(),
//!     false,
//! );
//! ```

pub use quitguard_core::*;

/// Widgets for presenting the quit gesture.
pub mod widgets {
    pub use quitguard_widgets::*;
}

pub use crossterm;
pub use ratatui;
pub use tokio;

/// Open (or create) a file for appending log output.
///
/// The terminal belongs to the UI while it runs, so diagnostics go to a
/// file instead:
///
/// ```no_run
/// let file = quitguard::log_to_file("quitguard.log").unwrap();
/// # drop(file);
/// ```
pub fn log_to_file(path: impl AsRef<std::path::Path>) -> Result<std::fs::File, std::io::Error> {
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingAnalytics, RecordingReplySink, ScriptedEventSource};
    use crate::widgets::HoldToQuitOverlay;
    use crossterm::event::{KeyCode, KeyModifiers};
    use futures::StreamExt;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use tokio::task::LocalSet;

    struct App {
        source: Rc<RefCell<ScriptedEventSource>>,
        preferences: Rc<InMemoryPreferences>,
        analytics: Rc<RecordingAnalytics>,
        sink: Rc<RecordingReplySink>,
        handler: TerminationDeciderHandler,
        interceptors: InterceptorSlot,
    }

    impl App {
        fn new() -> Self {
            let sink = Rc::new(RecordingReplySink::default());
            Self {
                source: Rc::new(RefCell::new(ScriptedEventSource::new())),
                preferences: Rc::new(InMemoryPreferences::new()),
                analytics: Rc::new(RecordingAnalytics::default()),
                handler: TerminationDeciderHandler::new(sink.clone()),
                sink,
                interceptors: InterceptorSlot::new(),
            }
        }

        fn manager(&self) -> WarnBeforeQuitManager {
            let env = QuitEnvironment {
                events: self.source.clone(),
                interceptors: self.interceptors.clone(),
                preferences: self.preferences.clone(),
                analytics: self.analytics.clone(),
            };
            let trigger = InputEvent::key_down(KeyCode::Char('q'), KeyModifiers::SUPER);
            let options = WarnBeforeQuitOptions::default();
            WarnBeforeQuitManager::new(&trigger, WarnBeforeQuitAction::Quit, env, options)
                .expect("⌘Q triggers the manager")
        }

        fn quit(
            &self,
            manager: &WarnBeforeQuitManager,
            extra: Option<(DeciderSlot, Box<dyn TerminationDecider>)>,
        ) -> TerminationReply {
            self.handler.on_finish(manager.completion_hook());
            let mut chain = TerminationChain::new().with(DeciderSlot::WarnBeforeQuit, manager.clone());
            if let Some((slot, decider)) = extra {
                chain.push(slot, decider);
            }
            self.handler.execute_deciders(chain.build(), false)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn held_quit_terminates_after_reply() {
        LocalSet::new()
            .run_until(async {
                let app = App::new();
                let manager = app.manager();
                app.source.borrow_mut().push_at(
                    Duration::from_millis(900),
                    InputEvent::key_up(KeyCode::Char('q'), KeyModifiers::SUPER),
                );

                assert_eq!(app.quit(&manager, None), TerminationReply::TerminateLater);
                tokio::time::sleep(Duration::from_millis(100)).await;

                assert_eq!(app.sink.replies(), vec![true]);
                assert_eq!(manager.state(), WarnBeforeQuitState::Completed { should_proceed: true });
                // The finish hook drained the release of the held key.
                assert!(!manager.key_still_down());
                assert_eq!(app.source.borrow().remaining(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn tapped_quit_times_out_and_stays_open() {
        LocalSet::new()
            .run_until(async {
                let app = App::new();
                let manager = app.manager();
                app.source.borrow_mut().push_at(
                    Duration::from_millis(50),
                    InputEvent::key_up(KeyCode::Char('q'), KeyModifiers::SUPER),
                );

                assert_eq!(app.quit(&manager, None), TerminationReply::TerminateLater);
                assert!(app.handler.is_in_flight());

                tokio::time::sleep(Duration::from_secs(5)).await;
                assert_eq!(app.sink.replies(), vec![false]);
                assert_eq!(manager.state(), WarnBeforeQuitState::Completed { should_proceed: false });
                assert!(!app.handler.is_in_flight());
                assert_eq!(
                    app.analytics.events()[0].reason,
                    ResolutionReason::Timeout
                );
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn second_quit_request_is_rejected_while_waiting() {
        LocalSet::new()
            .run_until(async {
                let app = App::new();
                let manager = app.manager();
                app.source.borrow_mut().push_at(
                    Duration::from_millis(50),
                    InputEvent::key_up(KeyCode::Char('q'), KeyModifiers::SUPER),
                );
                app.quit(&manager, None);

                let again = app.manager();
                assert_eq!(app.quit(&again, None), TerminationReply::TerminateLater);
                assert_eq!(again.state(), WarnBeforeQuitState::Idle);
            })
            .await;
    }

    #[test]
    fn earlier_cancel_skips_the_gesture() {
        let app = App::new();
        let manager = app.manager();
        let downloads: Box<dyn TerminationDecider> =
            Box::new(FnDecider::new("downloads", |_| TerminationQuery::cancel()));
        let reply = app.quit(&manager, Some((DeciderSlot::ActiveDownloads, downloads)));
        assert_eq!(reply, TerminationReply::TerminateCancel);
        assert_eq!(manager.state(), WarnBeforeQuitState::Idle);
        assert!(app.analytics.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overlay_follows_the_state_stream() {
        let app = App::new();
        let mut manager = app.manager();
        let mut overlay = HoldToQuitOverlay::new(manager.shortcut(), manager.action());
        let mut states = manager.state_stream();
        app.source.borrow_mut().push_at(
            Duration::from_millis(400),
            InputEvent::key_up(KeyCode::Char('q'), KeyModifiers::SUPER),
        );

        let query = manager.should_terminate(false);
        assert!(query.is_async());

        let mut seen = Vec::new();
        for _ in 0..3 {
            let state = states.next().await.expect("state published");
            overlay.update(state);
            seen.push(overlay.is_visible());
        }
        // KeyDown is invisible, Holding and WaitingForSecondPress are shown.
        assert_eq!(seen, vec![false, true, true]);
        assert!(overlay.message().starts_with("Press"));
    }
}
