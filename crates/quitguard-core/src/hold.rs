//! Synchronous detection of the hold-to-confirm gesture.
//!
//! The detector blocks the calling frame, pulling key, modifier and
//! mouse-down events straight off the [`EventSource`] with a deadline. Events
//! it does not consume are put back so the rest of the UI still sees them.

use crate::config::WarnBeforeQuitOptions;
use crate::event::{EventMask, InputEvent};
use crate::event_queue::EventSource;
use crate::shortcut::Shortcut;
use crate::state::Transition;
use crossterm::event::KeyEventKind;
use std::time::{Duration, Instant};

/// How a press of the guarded shortcut ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    /// The gesture reached a verdict.
    Completed {
        /// `true` if the full hold duration elapsed.
        should_proceed: bool,
        /// `true` if the shortcut is still physically down.
        key_still_down: bool,
    },
    /// The shortcut (or a required modifier) was released before the hold
    /// completed.
    ReleasedEarly {
        /// Time between the start of detection and the release.
        held_for: Duration,
        /// Whether progress had become visible.
        progress_visible: bool,
    },
}

/// Classifies one press of a shortcut as a hold, an early release, or an
/// interruption.
pub struct HoldGestureDetector<'a> {
    shortcut: Shortcut,
    options: &'a WarnBeforeQuitOptions,
}

impl<'a> HoldGestureDetector<'a> {
    /// A detector for `shortcut` using the thresholds in `options`.
    pub fn new(shortcut: Shortcut, options: &'a WarnBeforeQuitOptions) -> Self {
        Self { shortcut, options }
    }

    /// Track the press that just happened until it resolves.
    ///
    /// `on_transition` receives [`Transition::Press`] immediately and
    /// [`Transition::HoldStarted`] once the progress threshold passes.
    pub fn detect(
        &self,
        source: &mut dyn EventSource,
        on_transition: &mut dyn FnMut(Transition),
    ) -> HoldOutcome {
        let start = source.now();
        on_transition(Transition::Press);

        let mut deadline = start + self.options.progress_threshold;
        let mut holding = false;
        let mut unrelated = Vec::new();

        let outcome = loop {
            let Some(event) = source.next_event_matching(hold_mask(), deadline) else {
                if source.is_disconnected() {
                    tracing::warn!("input feed gone; treating hold as interrupted");
                    break HoldOutcome::Completed {
                        should_proceed: false,
                        key_still_down: false,
                    };
                }
                if holding {
                    break HoldOutcome::Completed {
                        should_proceed: true,
                        key_still_down: true,
                    };
                }
                holding = true;
                let now = source.now();
                on_transition(Transition::HoldStarted {
                    started_at: now,
                    target_time: now
                        + self.options.required_hold_duration
                        + self.options.hold_animation_buffer,
                });
                deadline = now + self.options.required_hold_duration;
                continue;
            };

            if self.shortcut.is_released_by(&event) {
                break HoldOutcome::ReleasedEarly {
                    held_for: source.now().saturating_duration_since(start),
                    progress_visible: holding,
                };
            }
            if self.shortcut.matches_repeat(&event) || self.shortcut.matches_press(&event) {
                // Swallowed: forwarding repeats would beep.
                continue;
            }
            match &event {
                InputEvent::FlagsChanged(_) => continue,
                InputEvent::Key(key) if key.kind == KeyEventKind::Release => {
                    unrelated.push(event);
                }
                _ => {
                    tracing::debug!(?event, "hold interrupted by other input");
                    unrelated.push(event);
                    break HoldOutcome::Completed {
                        should_proceed: false,
                        key_still_down: false,
                    };
                }
            }
        };

        for event in unrelated.into_iter().rev() {
            source.post_event(event, true);
        }
        tracing::debug!(?outcome, "hold gesture resolved");
        outcome
    }
}

fn hold_mask() -> EventMask {
    EventMask::KEY_DOWN | EventMask::KEY_UP | EventMask::FLAGS_CHANGED | EventMask::MOUSE_DOWN
}

/// Swallow key and modifier events until `shortcut` is released, or until
/// `timeout` passes.
///
/// Run after a confirmed hold so the still-held key does not leak into
/// whatever receives input next. Returns `true` if the release was seen.
pub fn drain_key_release(source: &mut dyn EventSource, shortcut: Shortcut, timeout: Duration) -> bool {
    let deadline: Instant = source.now() + timeout;
    let mask = EventMask::KEY_DOWN | EventMask::KEY_UP | EventMask::FLAGS_CHANGED;
    while let Some(event) = source.next_event_matching(mask, deadline) {
        if shortcut.is_released_by(&event) {
            tracing::trace!("held shortcut released");
            return true;
        }
    }
    tracing::debug!(?timeout, "gave up waiting for shortcut release");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_queue::ChannelEventQueue;
    use crate::testing::ScriptedEventSource;
    use crossterm::event::{KeyCode, KeyModifiers};

    const CMD_Q: Shortcut = Shortcut::cmd('q');

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn run(source: &mut ScriptedEventSource) -> (HoldOutcome, Vec<Transition>) {
        let options = WarnBeforeQuitOptions::default();
        let mut transitions = Vec::new();
        let outcome = HoldGestureDetector::new(CMD_Q, &options)
            .detect(source, &mut |t| transitions.push(t));
        (outcome, transitions)
    }

    #[test]
    fn silence_completes_the_hold() {
        let mut source = ScriptedEventSource::new();
        let (outcome, transitions) = run(&mut source);
        assert_eq!(
            outcome,
            HoldOutcome::Completed { should_proceed: true, key_still_down: true }
        );
        assert_eq!(source.elapsed(), ms(700));
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0], Transition::Press);
        let Transition::HoldStarted { started_at, target_time } = transitions[1] else {
            panic!("expected HoldStarted, got {:?}", transitions[1]);
        };
        assert_eq!(started_at, source.origin() + ms(100));
        assert_eq!(target_time, started_at + ms(650));
    }

    #[test]
    fn key_up_before_threshold_is_an_early_release() {
        let mut source = ScriptedEventSource::new();
        source.push_at(ms(50), InputEvent::key_up(KeyCode::Char('q'), KeyModifiers::SUPER));
        let (outcome, transitions) = run(&mut source);
        assert_eq!(
            outcome,
            HoldOutcome::ReleasedEarly { held_for: ms(50), progress_visible: false }
        );
        assert_eq!(transitions, vec![Transition::Press]);
    }

    #[test]
    fn modifier_release_during_hold_is_an_early_release() {
        let mut source = ScriptedEventSource::new();
        source.push_at(ms(300), InputEvent::FlagsChanged(KeyModifiers::NONE));
        let (outcome, _) = run(&mut source);
        assert_eq!(
            outcome,
            HoldOutcome::ReleasedEarly { held_for: ms(300), progress_visible: true }
        );
    }

    #[test]
    fn repeats_and_extra_modifiers_are_swallowed() {
        let mut source = ScriptedEventSource::new();
        source.push_at(ms(150), InputEvent::key_repeat(KeyCode::Char('q'), KeyModifiers::SUPER));
        source.push_at(
            ms(200),
            InputEvent::FlagsChanged(KeyModifiers::SUPER | KeyModifiers::SHIFT),
        );
        let (outcome, _) = run(&mut source);
        assert_eq!(
            outcome,
            HoldOutcome::Completed { should_proceed: true, key_still_down: true }
        );
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn other_key_cancels_and_is_reposted() {
        let mut source = ScriptedEventSource::new();
        let other = InputEvent::key_down(KeyCode::Char('a'), KeyModifiers::SUPER);
        source.push_at(ms(250), other.clone());
        let (outcome, _) = run(&mut source);
        assert_eq!(
            outcome,
            HoldOutcome::Completed { should_proceed: false, key_still_down: false }
        );
        assert_eq!(source.next_event(), Some(other));
    }

    #[test]
    fn mouse_down_cancels_and_is_reposted() {
        let mut source = ScriptedEventSource::new();
        source.push_at(ms(20), InputEvent::mouse_down(3, 4));
        let (outcome, _) = run(&mut source);
        assert!(matches!(outcome, HoldOutcome::Completed { should_proceed: false, .. }));
        assert_eq!(source.next_event(), Some(InputEvent::mouse_down(3, 4)));
    }

    #[test]
    fn unrelated_key_up_is_passed_through_and_hold_continues() {
        let mut source = ScriptedEventSource::new();
        let stray = InputEvent::key_up(KeyCode::Char('x'), KeyModifiers::NONE);
        source.push_at(ms(10), stray.clone());
        let (outcome, _) = run(&mut source);
        assert!(matches!(outcome, HoldOutcome::Completed { should_proceed: true, .. }));
        assert_eq!(source.next_event(), Some(stray));
    }

    #[test]
    fn events_outside_the_mask_stay_queued() {
        let mut source = ScriptedEventSource::new();
        source.push_at(ms(10), InputEvent::Resize(100, 40));
        let (outcome, _) = run(&mut source);
        assert!(matches!(outcome, HoldOutcome::Completed { should_proceed: true, .. }));
        assert_eq!(source.next_event(), Some(InputEvent::Resize(100, 40)));
    }

    #[test]
    fn dead_feed_interrupts_instead_of_confirming() {
        let (sender, mut queue) = ChannelEventQueue::new();
        drop(sender);
        let options = WarnBeforeQuitOptions::default();
        let mut transitions = Vec::new();
        let outcome = HoldGestureDetector::new(CMD_Q, &options)
            .detect(&mut queue, &mut |t| transitions.push(t));
        assert_eq!(
            outcome,
            HoldOutcome::Completed { should_proceed: false, key_still_down: false }
        );
        assert_eq!(transitions, vec![Transition::Press]);
    }

    #[test]
    fn drain_stops_at_release() {
        let mut source = ScriptedEventSource::new();
        source.push_at(ms(40), InputEvent::key_repeat(KeyCode::Char('q'), KeyModifiers::SUPER));
        source.push_at(ms(80), InputEvent::key_up(KeyCode::Char('q'), KeyModifiers::SUPER));
        source.push_at(ms(90), InputEvent::key_down(KeyCode::Char('z'), KeyModifiers::NONE));
        assert!(drain_key_release(&mut source, CMD_Q, Duration::from_secs(3)));
        assert_eq!(source.elapsed(), ms(80));
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn drain_gives_up_after_timeout() {
        let mut source = ScriptedEventSource::new();
        assert!(!drain_key_release(&mut source, CMD_Q, Duration::from_secs(3)));
        assert_eq!(source.elapsed(), Duration::from_secs(3));
    }
}
