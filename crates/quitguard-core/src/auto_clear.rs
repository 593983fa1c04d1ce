//! Clearing browsing data as part of quitting.
//!
//! When auto-clear is on, quitting clears data first (optionally after
//! asking). A bookkeeping flag records whether the last termination got as
//! far as finishing the clear, so an interrupted quit can be made up for at
//! the next launch.

use crate::decision::{TerminationDecider, TerminationDecision, TerminationQuery};
use crate::preferences::AutoClearPreferences;
use futures::future::LocalBoxFuture;
use std::rc::Rc;

/// The three answers to "clear data before quitting?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearChoice {
    /// Clear, then quit.
    ClearAndQuit,
    /// Quit and leave the data alone this time.
    QuitWithoutClearing,
    /// Do not quit.
    Cancel,
}

/// Presents the clear-before-quit confirmation. Blocks until answered.
pub trait ClearConfirmation {
    fn confirm(&self) -> ClearChoice;
}

/// Performs the actual clearing.
pub trait DataClearer {
    /// Clear browsing data; resolves when done.
    fn clear(&self) -> LocalBoxFuture<'static, ()>;
}

/// The auto-clear termination decider.
#[derive(Clone)]
pub struct AutoClearHandler {
    preferences: Rc<dyn AutoClearPreferences>,
    confirmation: Rc<dyn ClearConfirmation>,
    clearer: Rc<dyn DataClearer>,
}

impl AutoClearHandler {
    pub fn new(
        preferences: Rc<dyn AutoClearPreferences>,
        confirmation: Rc<dyn ClearConfirmation>,
        clearer: Rc<dyn DataClearer>,
    ) -> Self {
        Self {
            preferences,
            confirmation,
            clearer,
        }
    }

    /// Run a clear at launch if auto-clear is on and the previous
    /// termination never finished clearing. Returns `true` if it ran.
    ///
    /// Call before [`reset_termination_flag`](Self::reset_termination_flag).
    pub async fn burn_on_startup_if_needed(&self) -> bool {
        let needed = self.preferences.is_auto_clear_enabled()
            && !self.preferences.termination_handled_correctly();
        if needed {
            tracing::info!("previous termination did not finish clearing; clearing now");
            self.clearer.clear().await;
        }
        needed
    }

    /// Mark the current run as not yet cleanly terminated.
    pub fn reset_termination_flag(&self) {
        self.preferences.set_termination_handled_correctly(false);
    }

    fn clear_then_next(&self) -> TerminationQuery {
        let preferences = self.preferences.clone();
        preferences.set_termination_handled_correctly(false);
        let clearing = self.clearer.clear();
        TerminationQuery::deferred(async move {
            clearing.await;
            preferences.set_termination_handled_correctly(true);
            tracing::debug!("data cleared before quitting");
            TerminationDecision::Next
        })
    }
}

impl TerminationDecider for AutoClearHandler {
    fn should_terminate(&mut self, _is_async: bool) -> TerminationQuery {
        if !self.preferences.is_auto_clear_enabled() {
            return TerminationQuery::next();
        }
        if !self.preferences.is_warn_before_clearing_enabled() {
            return self.clear_then_next();
        }
        let choice = self.confirmation.confirm();
        tracing::info!(?choice, "clear-before-quit answered");
        match choice {
            ClearChoice::ClearAndQuit => self.clear_then_next(),
            ClearChoice::QuitWithoutClearing => {
                self.preferences.set_termination_handled_correctly(true);
                TerminationQuery::next()
            }
            ClearChoice::Cancel => TerminationQuery::cancel(),
        }
    }

    fn name(&self) -> &str {
        "AutoClear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::InMemoryPreferences;
    use futures::FutureExt;
    use std::cell::Cell;
    use std::time::Duration;

    struct Choice(ClearChoice);

    impl ClearConfirmation for Choice {
        fn confirm(&self) -> ClearChoice {
            self.0
        }
    }

    #[derive(Default)]
    struct CountingClearer {
        runs: Rc<Cell<usize>>,
    }

    impl DataClearer for CountingClearer {
        fn clear(&self) -> LocalBoxFuture<'static, ()> {
            let runs = self.runs.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                runs.set(runs.get() + 1);
            }
            .boxed_local()
        }
    }

    fn handler(
        preferences: InMemoryPreferences,
        choice: ClearChoice,
    ) -> (AutoClearHandler, Rc<InMemoryPreferences>, Rc<Cell<usize>>) {
        let preferences = Rc::new(preferences);
        let clearer = CountingClearer::default();
        let runs = clearer.runs.clone();
        let handler = AutoClearHandler::new(preferences.clone(), Rc::new(Choice(choice)), Rc::new(clearer));
        (handler, preferences, runs)
    }

    #[test]
    fn disabled_auto_clear_proceeds() {
        let (mut handler, _, runs) = handler(InMemoryPreferences::new(), ClearChoice::Cancel);
        assert_eq!(handler.should_terminate(false).as_sync(), Some(TerminationDecision::Next));
        assert_eq!(runs.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clears_without_asking_when_warning_is_off() {
        let prefs = InMemoryPreferences::new().with_auto_clear(true, false);
        let (mut handler, prefs, runs) = handler(prefs, ClearChoice::Cancel);

        let query = handler.should_terminate(false);
        assert!(query.is_async());
        assert!(!prefs.termination_handled_correctly());
        assert_eq!(query.resolve().await, TerminationDecision::Next);
        assert_eq!(runs.get(), 1);
        assert!(prefs.termination_handled_correctly());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_and_quit_clears() {
        let prefs = InMemoryPreferences::new().with_auto_clear(true, true);
        let (mut handler, _, runs) = handler(prefs, ClearChoice::ClearAndQuit);
        assert_eq!(handler.should_terminate(false).resolve().await, TerminationDecision::Next);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn quit_without_clearing_and_cancel() {
        let prefs = InMemoryPreferences::new().with_auto_clear(true, true);
        prefs.set_termination_handled_correctly(false);
        let (mut skip, prefs, runs) = handler(prefs, ClearChoice::QuitWithoutClearing);
        assert_eq!(skip.should_terminate(false).as_sync(), Some(TerminationDecision::Next));
        assert!(prefs.termination_handled_correctly());
        assert_eq!(runs.get(), 0);

        let prefs = InMemoryPreferences::new().with_auto_clear(true, true);
        let (mut cancel, _, runs) = handler(prefs, ClearChoice::Cancel);
        assert_eq!(cancel.should_terminate(false).as_sync(), Some(TerminationDecision::Cancel));
        assert_eq!(runs.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupted_termination_is_made_up_at_launch() {
        let prefs = InMemoryPreferences::new().with_auto_clear(true, false);
        let (handler, prefs, runs) = handler(prefs, ClearChoice::Cancel);

        // Previous launch reset the flag and never quit cleanly.
        handler.reset_termination_flag();
        assert!(handler.burn_on_startup_if_needed().await);
        assert_eq!(runs.get(), 1);

        prefs.set_termination_handled_correctly(true);
        assert!(!handler.burn_on_startup_if_needed().await);
        assert_eq!(runs.get(), 1);
    }

    #[tokio::test]
    async fn no_startup_clear_when_auto_clear_is_off() {
        let (handler, prefs, runs) = handler(InMemoryPreferences::new(), ClearChoice::Cancel);
        prefs.set_termination_handled_correctly(false);
        assert!(!handler.burn_on_startup_if_needed().await);
        assert_eq!(runs.get(), 0);
    }
}
