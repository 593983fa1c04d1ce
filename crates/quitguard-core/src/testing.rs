//! Headless doubles for exercising the termination pipeline in tests.
//!
//! Nothing here needs a terminal. [`ScriptedEventSource`] runs on a virtual
//! clock that jumps straight to the next scheduled event (or deadline), so a
//! 600 ms hold completes instantly. The remaining types record what the
//! pipeline did so tests can assert on it.
//!
//! ```rust,ignore
//! let mut source = ScriptedEventSource::new();
//! source.push_at(Duration::from_millis(50), InputEvent::key_up(KeyCode::Char('q'), KeyModifiers::SUPER));
//! let outcome = HoldGestureDetector::new(Shortcut::cmd('q'), &options).detect(&mut source, &mut |_| {});
//! assert!(matches!(outcome, HoldOutcome::ReleasedEarly { .. }));
//! ```

use crate::analytics::{WarnBeforeQuitAnalytics, WarnBeforeQuitEvent};
use crate::decision::{TerminationDecider, TerminationDecision, TerminationQuery};
use crate::event::{EventMask, InputEvent};
use crate::event_queue::EventSource;
use crate::handler::TerminationReplySink;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// An [`EventSource`] replaying a fixed script on a virtual clock.
pub struct ScriptedEventSource {
    origin: Instant,
    now: Instant,
    posted: VecDeque<InputEvent>,
    scheduled: VecDeque<(Instant, InputEvent)>,
}

impl Default for ScriptedEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEventSource {
    /// An empty script starting at the current instant.
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            origin,
            now: origin,
            posted: VecDeque::new(),
            scheduled: VecDeque::new(),
        }
    }

    /// Schedule `event` to arrive `offset` after the script's origin.
    pub fn push_at(&mut self, offset: Duration, event: InputEvent) {
        let at = self.origin + offset;
        let index = self.scheduled.partition_point(|(t, _)| *t <= at);
        self.scheduled.insert(index, (at, event));
    }

    /// Schedule `event` to arrive `delay` after the current virtual time.
    pub fn push_after(&mut self, delay: Duration, event: InputEvent) {
        let offset = self.elapsed() + delay;
        self.push_at(offset, event);
    }

    /// The instant the virtual clock started at.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Virtual time consumed so far.
    pub fn elapsed(&self) -> Duration {
        self.now - self.origin
    }

    /// Events not yet delivered (re-posted plus scheduled).
    pub fn remaining(&self) -> usize {
        self.posted.len() + self.scheduled.len()
    }

    /// Next event of any kind, advancing the clock as needed.
    pub fn next_event(&mut self) -> Option<InputEvent> {
        if let Some(event) = self.posted.pop_front() {
            return Some(event);
        }
        let (at, event) = self.scheduled.pop_front()?;
        self.now = self.now.max(at);
        Some(event)
    }
}

impl EventSource for ScriptedEventSource {
    fn now(&self) -> Instant {
        self.now
    }

    fn next_event_matching(&mut self, mask: EventMask, deadline: Instant) -> Option<InputEvent> {
        if let Some(index) = self.posted.iter().position(|event| mask.matches(event)) {
            return self.posted.remove(index);
        }
        let found = self
            .scheduled
            .iter()
            .take_while(|(at, _)| *at <= deadline)
            .position(|(_, event)| mask.matches(event));
        match found.and_then(|index| self.scheduled.remove(index)) {
            Some((at, event)) => {
                self.now = self.now.max(at);
                Some(event)
            }
            None => {
                self.now = self.now.max(deadline);
                None
            }
        }
    }

    fn post_event(&mut self, event: InputEvent, at_start: bool) {
        if at_start {
            self.posted.push_front(event);
        } else {
            self.posted.push_back(event);
        }
    }
}

/// Shared record of which deciders were consulted, in order.
#[derive(Debug, Clone, Default)]
pub struct DeciderLog {
    entries: Rc<RefCell<Vec<(String, bool)>>>,
}

impl DeciderLog {
    /// Decider names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|(name, _)| name.clone()).collect()
    }

    /// The `is_async` flag each decider was called with.
    pub fn async_flags(&self) -> Vec<bool> {
        self.entries.borrow().iter().map(|(_, is_async)| *is_async).collect()
    }

    fn record(&self, name: &str, is_async: bool) {
        self.entries.borrow_mut().push((name.to_owned(), is_async));
    }
}

enum Script {
    Now(TerminationDecision),
    After(Duration, TerminationDecision),
}

/// A decider that answers from a script and logs every call.
pub struct ScriptedDecider {
    name: String,
    script: Script,
    log: DeciderLog,
}

impl ScriptedDecider {
    fn scripted(name: &str, script: Script, log: &DeciderLog) -> Self {
        Self {
            name: name.to_owned(),
            script,
            log: log.clone(),
        }
    }

    /// Answers `Sync(Next)`.
    pub fn next(name: &str, log: &DeciderLog) -> Self {
        Self::scripted(name, Script::Now(TerminationDecision::Next), log)
    }

    /// Answers `Sync(Cancel)`.
    pub fn cancel(name: &str, log: &DeciderLog) -> Self {
        Self::scripted(name, Script::Now(TerminationDecision::Cancel), log)
    }

    /// Answers `Next` after sleeping for `delay` on the tokio clock.
    pub fn next_after(name: &str, delay: Duration, log: &DeciderLog) -> Self {
        Self::scripted(name, Script::After(delay, TerminationDecision::Next), log)
    }

    /// Answers `Cancel` after sleeping for `delay` on the tokio clock.
    pub fn cancel_after(name: &str, delay: Duration, log: &DeciderLog) -> Self {
        Self::scripted(name, Script::After(delay, TerminationDecision::Cancel), log)
    }
}

impl TerminationDecider for ScriptedDecider {
    fn should_terminate(&mut self, is_async: bool) -> TerminationQuery {
        self.log.record(&self.name, is_async);
        match self.script {
            Script::Now(decision) => TerminationQuery::Sync(decision),
            Script::After(delay, decision) => TerminationQuery::deferred(async move {
                tokio::time::sleep(delay).await;
                decision
            }),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Records every deferred reply the handler sends.
#[derive(Debug, Default)]
pub struct RecordingReplySink {
    replies: RefCell<Vec<bool>>,
}

impl RecordingReplySink {
    /// Replies received so far.
    pub fn replies(&self) -> Vec<bool> {
        self.replies.borrow().clone()
    }
}

impl TerminationReplySink for RecordingReplySink {
    fn reply_to_should_terminate(&self, should_terminate: bool) {
        self.replies.borrow_mut().push(should_terminate);
    }
}

/// How [`RecordingAnalytics`] acknowledges events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckBehavior {
    /// Acknowledge immediately.
    #[default]
    Immediate,
    /// Acknowledge after a delay on the tokio clock.
    After(Duration),
    /// Never acknowledge.
    Never,
}

/// Records analytics events; acknowledges them per [`AckBehavior`].
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: RefCell<Vec<WarnBeforeQuitEvent>>,
    ack: AckBehavior,
}

impl RecordingAnalytics {
    /// A recorder that acknowledges according to `ack`.
    pub fn with_ack(ack: AckBehavior) -> Self {
        Self {
            events: RefCell::default(),
            ack,
        }
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<WarnBeforeQuitEvent> {
        self.events.borrow().clone()
    }
}

impl WarnBeforeQuitAnalytics for RecordingAnalytics {
    fn record(&self, event: WarnBeforeQuitEvent) -> LocalBoxFuture<'static, ()> {
        self.events.borrow_mut().push(event);
        match self.ack {
            AckBehavior::Immediate => async {}.boxed_local(),
            AckBehavior::After(delay) => tokio::time::sleep(delay).boxed_local(),
            AckBehavior::Never => futures::future::pending().boxed_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn virtual_clock_jumps_to_matching_event() {
        let mut source = ScriptedEventSource::new();
        source.push_at(Duration::from_millis(30), InputEvent::FocusLost);
        source.push_at(
            Duration::from_millis(60),
            InputEvent::key_down(KeyCode::Char('a'), KeyModifiers::NONE),
        );
        let deadline = source.origin() + Duration::from_secs(1);
        let event = source.next_event_matching(EventMask::KEY_DOWN, deadline);
        assert!(matches!(event, Some(InputEvent::Key(_))));
        assert_eq!(source.elapsed(), Duration::from_millis(60));
        assert_eq!(source.next_event(), Some(InputEvent::FocusLost));
    }

    #[test]
    fn events_past_the_deadline_are_not_delivered() {
        let mut source = ScriptedEventSource::new();
        source.push_at(Duration::from_millis(200), InputEvent::FlagsChanged(KeyModifiers::NONE));
        let deadline = source.origin() + Duration::from_millis(100);
        assert_eq!(source.next_event_matching(EventMask::ALL, deadline), None);
        assert_eq!(source.elapsed(), Duration::from_millis(100));
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn push_after_is_relative_to_virtual_now() {
        let mut source = ScriptedEventSource::new();
        let deadline = source.origin() + Duration::from_millis(500);
        source.next_event_matching(EventMask::ALL, deadline);
        source.push_after(Duration::from_millis(10), InputEvent::FocusGained);
        let far = source.origin() + Duration::from_secs(5);
        assert_eq!(
            source.next_event_matching(EventMask::OTHER, far),
            Some(InputEvent::FocusGained)
        );
        assert_eq!(source.elapsed(), Duration::from_millis(510));
    }

    #[test]
    fn scripted_decider_logs_calls() {
        let log = DeciderLog::default();
        let mut decider = ScriptedDecider::cancel("downloads", &log);
        assert_eq!(decider.should_terminate(true).as_sync(), Some(TerminationDecision::Cancel));
        assert_eq!(log.calls(), vec!["downloads"]);
        assert_eq!(log.async_flags(), vec![true]);
        assert_eq!(decider.name(), "downloads");
    }
}
