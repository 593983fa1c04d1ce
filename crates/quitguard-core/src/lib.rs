//! Core of **quitguard**: deciding whether an application may quit.
//!
//! When the platform asks "should the application terminate?", an ordered
//! chain of voters ([`TerminationDecider`]s) is consulted by a
//! [`TerminationDeciderHandler`]. Most voters answer on the spot; a voter
//! that needs the user, or needs to finish some work, defers and pauses the
//! chain until its future resolves.
//!
//! The most involved voter is the hold-to-confirm gesture
//! ([`WarnBeforeQuitManager`]): ⌘Q has to be held for a moment, or pressed a
//! second time, before the application actually quits.
//!
//! # Key types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`TerminationQuery`] | A voter's answer: now (`Sync`) or later (`Async`) |
//! | [`TerminationDeciderHandler`] | Runs the chain and replies to the platform |
//! | [`TerminationChain`] | Orders deciders by [`DeciderSlot`] |
//! | [`WarnBeforeQuitManager`] | The hold / second-press gesture as a decider |
//! | [`AutoClearHandler`] | Clears browsing data on quit |
//! | [`EventSource`] | Native input queue that can be waited on with a deadline |
//! | [`InterceptorSlot`] | The single application-wide event interceptor |
//! | [`testing`] | Headless doubles for tests |
//!
//! # Threading
//!
//! Everything here lives on the UI thread. Types are `!Send`, and deferred
//! chain continuations are started with [`tokio::task::spawn_local`], so the
//! handler must run inside a [`tokio::task::LocalSet`].

pub mod analytics;
pub mod auto_clear;
pub mod chain;
pub mod config;
pub mod deciders;
pub mod decision;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod handler;
pub mod hold;
pub mod interceptor;
pub mod preferences;
pub mod promise;
mod second_press;
pub mod shortcut;
pub mod state;
pub mod testing;
pub mod warn_before_quit;

pub use analytics::{
    NoopAnalytics, ResolutionReason, WarnBeforeQuitAction, WarnBeforeQuitAnalytics,
    WarnBeforeQuitEvent,
};
pub use auto_clear::{AutoClearHandler, ClearChoice, ClearConfirmation, DataClearer};
pub use chain::{DeciderSlot, TerminationChain};
pub use config::WarnBeforeQuitOptions;
pub use deciders::{ActiveDownloadsDecider, DownloadsConfirmation, DownloadsQuery, FlushDecider};
pub use decision::{FnDecider, TerminationDecider, TerminationDecision, TerminationQuery};
pub use error::FeedError;
pub use event::{EventMask, InputEvent};
pub use event_queue::{spawn_terminal_feed, ChannelEventQueue, EventSource, SharedEventSource};
pub use handler::{DeciderList, TerminationDeciderHandler, TerminationReply, TerminationReplySink};
pub use hold::{drain_key_release, HoldGestureDetector, HoldOutcome};
pub use interceptor::{InterceptHook, InterceptorSlot, OwnerToken};
pub use preferences::{AutoClearPreferences, InMemoryPreferences, WarnBeforeQuitPreferences};
pub use shortcut::Shortcut;
pub use state::{Transition, WarnBeforeQuitState};
pub use warn_before_quit::{QuitEnvironment, WarnBeforeQuitManager};
