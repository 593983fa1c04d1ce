//! The native input stream, as seen by code that must block on it.
//!
//! The hold gesture cannot be expressed as ordinary event handling: it has to
//! stop and wait, with a deadline, for the next key or modifier event while
//! leaving everything else queued for the rest of the UI. [`EventSource`]
//! captures exactly that contract (a bounded-deadline, non-destructive
//! conditional dequeue plus re-injection).

use crate::error::FeedError;
use crate::event::{EventMask, InputEvent};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A queue of native input events that can be waited on synchronously.
pub trait EventSource {
    /// The clock the source measures deadlines against.
    fn now(&self) -> Instant;

    /// Remove and return the first queued event matching `mask`, waiting
    /// until `deadline` for one to arrive.
    ///
    /// Events that do not match `mask` stay queued, in order. Returns `None`
    /// once the deadline passes without a matching event.
    fn next_event_matching(&mut self, mask: EventMask, deadline: Instant) -> Option<InputEvent>;

    /// Put an event back into the queue, at the head if `at_start`.
    fn post_event(&mut self, event: InputEvent, at_start: bool);

    /// Whether the source has stopped producing events. A `None` from
    /// [`next_event_matching`](EventSource::next_event_matching) on a
    /// disconnected source does not mean the deadline passed.
    fn is_disconnected(&self) -> bool {
        false
    }
}

/// Shared handle to the UI thread's event source.
///
/// Holders must not keep the `RefCell` borrowed while dispatching an event,
/// because interceptor hooks may pump the queue from inside the dispatch.
pub type SharedEventSource = Rc<RefCell<dyn EventSource>>;

/// An [`EventSource`] fed through a crossbeam channel.
///
/// The platform's input layer (for example [`spawn_terminal_feed`]) sends
/// events into the channel; the UI thread pulls them with
/// [`next_event`](ChannelEventQueue::next_event) or, while a gesture is being
/// tracked, with [`EventSource::next_event_matching`].
pub struct ChannelEventQueue {
    receiver: Receiver<InputEvent>,
    pending: VecDeque<InputEvent>,
    disconnected: bool,
}

impl ChannelEventQueue {
    /// Create a queue and the sender that feeds it.
    pub fn new() -> (Sender<InputEvent>, Self) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (
            sender,
            Self {
                receiver,
                pending: VecDeque::new(),
                disconnected: false,
            },
        )
    }

    /// Next event in arrival order, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` on timeout and [`FeedError::Disconnected`] once
    /// every sender is gone and the queue is drained.
    pub fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, FeedError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.disconnected = true;
                Err(FeedError::Disconnected)
            }
        }
    }

    /// Number of events skipped or re-posted and not yet delivered.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl EventSource for ChannelEventQueue {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn next_event_matching(&mut self, mask: EventMask, deadline: Instant) -> Option<InputEvent> {
        if let Some(index) = self.pending.iter().position(|event| mask.matches(event)) {
            return self.pending.remove(index);
        }
        loop {
            match self.receiver.recv_deadline(deadline) {
                Ok(event) if mask.matches(&event) => return Some(event),
                Ok(event) => self.pending.push_back(event),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("input feed disconnected while tracking a gesture");
                    self.disconnected = true;
                    return None;
                }
            }
        }
    }

    fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    fn post_event(&mut self, event: InputEvent, at_start: bool) {
        if at_start {
            self.pending.push_front(event);
        } else {
            self.pending.push_back(event);
        }
    }
}

/// Start a background thread translating crossterm events into `sender`.
///
/// The thread exits when the receiving [`ChannelEventQueue`] is dropped (the
/// next send fails) or when reading from the terminal fails. The terminal
/// must already be in raw mode.
pub fn spawn_terminal_feed(sender: Sender<InputEvent>) -> std::thread::JoinHandle<Result<(), FeedError>> {
    std::thread::spawn(move || -> Result<(), FeedError> {
        loop {
            let event = crossterm::event::read()?;
            if sender.send(InputEvent::from(event)).is_err() {
                tracing::debug!("event queue dropped; stopping terminal feed");
                return Ok(());
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn q_down() -> InputEvent {
        InputEvent::key_down(KeyCode::Char('q'), KeyModifiers::SUPER)
    }

    fn q_up() -> InputEvent {
        InputEvent::key_up(KeyCode::Char('q'), KeyModifiers::SUPER)
    }

    #[test]
    fn matching_dequeue_leaves_other_events_in_order() {
        let (tx, mut queue) = ChannelEventQueue::new();
        tx.send(InputEvent::Resize(10, 10)).unwrap();
        tx.send(InputEvent::FocusLost).unwrap();
        tx.send(q_up()).unwrap();

        let deadline = Instant::now() + Duration::from_millis(50);
        assert_eq!(queue.next_event_matching(EventMask::KEY_UP, deadline), Some(q_up()));
        assert_eq!(queue.pending_len(), 2);
        assert_eq!(
            queue.next_event(Duration::ZERO).unwrap(),
            Some(InputEvent::Resize(10, 10))
        );
        assert_eq!(queue.next_event(Duration::ZERO).unwrap(), Some(InputEvent::FocusLost));
    }

    #[test]
    fn deadline_without_match_returns_none() {
        let (_tx, mut queue) = ChannelEventQueue::new();
        let start = Instant::now();
        let result =
            queue.next_event_matching(EventMask::KEY_DOWN, start + Duration::from_millis(20));
        assert_eq!(result, None);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn posted_events_are_seen_first() {
        let (tx, mut queue) = ChannelEventQueue::new();
        tx.send(q_up()).unwrap();
        queue.post_event(q_down(), true);
        let deadline = Instant::now() + Duration::from_millis(10);
        assert_eq!(
            queue.next_event_matching(EventMask::KEY_DOWN | EventMask::KEY_UP, deadline),
            Some(q_down())
        );
    }

    #[test]
    fn post_at_end_keeps_order() {
        let (_tx, mut queue) = ChannelEventQueue::new();
        queue.post_event(InputEvent::FocusGained, false);
        queue.post_event(InputEvent::FocusLost, false);
        assert_eq!(queue.next_event(Duration::ZERO).unwrap(), Some(InputEvent::FocusGained));
        assert_eq!(queue.next_event(Duration::ZERO).unwrap(), Some(InputEvent::FocusLost));
    }

    #[test]
    fn disconnected_feed_reports_error() {
        let (tx, mut queue) = ChannelEventQueue::new();
        drop(tx);
        assert!(matches!(
            queue.next_event(Duration::from_millis(1)),
            Err(FeedError::Disconnected)
        ));
        assert!(queue.is_disconnected());
    }

    #[test]
    fn disconnect_during_matching_is_flagged() {
        let (tx, mut queue) = ChannelEventQueue::new();
        tx.send(InputEvent::FocusLost).unwrap();
        drop(tx);
        assert!(!queue.is_disconnected());
        let deadline = Instant::now() + Duration::from_secs(5);
        assert_eq!(queue.next_event_matching(EventMask::KEY_UP, deadline), None);
        assert!(queue.is_disconnected());
        // Buffered events are still delivered.
        assert_eq!(queue.pending_len(), 1);
    }
}
