//! Assembling the per-attempt decider list in a fixed precedence order.

use crate::decision::TerminationDecider;
use crate::handler::DeciderList;

/// Where a decider sits in the termination chain. Earlier slots vote first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeciderSlot {
    /// Optional exit survey.
    QuitSurvey,
    /// Downloads still in progress.
    ActiveDownloads,
    /// The hold-to-confirm gesture.
    WarnBeforeQuit,
    /// Updater housekeeping.
    UpdaterCleanup,
    /// Saving window state for the next launch.
    StateRestoration,
    /// Clearing browsing data on quit.
    AutoClear,
    /// Flushing privacy statistics.
    PrivacyStatsFlush,
}

/// Builder for the decider list handed to
/// [`TerminationDeciderHandler::execute_deciders`](crate::handler::TerminationDeciderHandler::execute_deciders).
///
/// Build a fresh chain for every termination attempt; deciders may keep
/// per-attempt state.
///
/// ```
/// use quitguard_core::chain::{DeciderSlot, TerminationChain};
/// use quitguard_core::{FnDecider, TerminationQuery};
///
/// let deciders = TerminationChain::new()
///     .with(DeciderSlot::AutoClear, FnDecider::new("clear", |_| TerminationQuery::next()))
///     .with(DeciderSlot::ActiveDownloads, FnDecider::new("downloads", |_| TerminationQuery::next()))
///     .build();
/// let names: Vec<_> = deciders.iter().map(|d| d.name().to_owned()).collect();
/// assert_eq!(names, ["downloads", "clear"]);
/// ```
#[derive(Default)]
pub struct TerminationChain {
    entries: Vec<(DeciderSlot, Box<dyn TerminationDecider>)>,
}

impl TerminationChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `decider` at `slot`.
    pub fn with(mut self, slot: DeciderSlot, decider: impl TerminationDecider + 'static) -> Self {
        self.push(slot, Box::new(decider));
        self
    }

    /// Add an already boxed decider at `slot`.
    pub fn push(&mut self, slot: DeciderSlot, decider: Box<dyn TerminationDecider>) {
        self.entries.push((slot, decider));
    }

    /// Number of deciders added.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no decider was added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deciders ordered by slot. Deciders sharing a slot keep insertion
    /// order.
    pub fn build(mut self) -> DeciderList {
        self.entries.sort_by_key(|(slot, _)| *slot);
        tracing::debug!(
            slots = ?self.entries.iter().map(|(slot, _)| *slot).collect::<Vec<_>>(),
            "termination chain built"
        );
        self.entries.into_iter().map(|(_, decider)| decider).collect()
    }
}
