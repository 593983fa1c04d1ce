use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;

/// A single decider's verdict on whether the application may quit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationDecision {
    /// Defer to the remaining deciders (and eventually terminate).
    Next,
    /// Abort termination entirely.
    Cancel,
}

impl TerminationDecision {
    /// Map a "should proceed" flag to a decision.
    pub fn from_proceed(proceed: bool) -> Self {
        if proceed {
            TerminationDecision::Next
        } else {
            TerminationDecision::Cancel
        }
    }

    /// Returns `true` for [`Next`](TerminationDecision::Next).
    pub fn proceeds(self) -> bool {
        matches!(self, TerminationDecision::Next)
    }
}

/// The answer a decider gives when asked whether the application may quit.
///
/// Most deciders know the answer immediately and return
/// [`Sync`](TerminationQuery::Sync). Deciders that must wait on a user-facing
/// confirmation or on cleanup work return [`Async`](TerminationQuery::Async),
/// which pauses the whole chain until the future resolves.
///
/// The pending future is local to the UI thread (`!Send`) and is never
/// cancelled by the handler.
pub enum TerminationQuery {
    /// The decision is available right now.
    Sync(TerminationDecision),
    /// The decision will be produced by this future.
    Async(LocalBoxFuture<'static, TerminationDecision>),
}

impl TerminationQuery {
    /// `Sync(Next)`.
    pub fn next() -> Self {
        TerminationQuery::Sync(TerminationDecision::Next)
    }

    /// `Sync(Cancel)`.
    pub fn cancel() -> Self {
        TerminationQuery::Sync(TerminationDecision::Cancel)
    }

    /// Wrap a future producing the decision later.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = TerminationDecision> + 'static,
    {
        TerminationQuery::Async(future.boxed_local())
    }

    /// Returns `true` if the decision is not yet known.
    pub fn is_async(&self) -> bool {
        matches!(self, TerminationQuery::Async(_))
    }

    /// The immediate decision, if this is a `Sync` query.
    pub fn as_sync(&self) -> Option<TerminationDecision> {
        match self {
            TerminationQuery::Sync(decision) => Some(*decision),
            TerminationQuery::Async(_) => None,
        }
    }

    /// Collapse either variant to its decision.
    pub async fn resolve(self) -> TerminationDecision {
        match self {
            TerminationQuery::Sync(decision) => decision,
            TerminationQuery::Async(future) => future.await,
        }
    }
}

impl From<TerminationDecision> for TerminationQuery {
    fn from(decision: TerminationDecision) -> Self {
        TerminationQuery::Sync(decision)
    }
}

impl fmt::Debug for TerminationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationQuery::Sync(decision) => f.debug_tuple("Sync").field(decision).finish(),
            TerminationQuery::Async(_) => f.write_str("Async(..)"),
        }
    }
}

/// A voter in the termination chain.
///
/// `is_async` is `true` when an earlier decider in the same chain already
/// deferred, meaning the platform has been told "terminate later" and the
/// chain is now running as a continuation. Deciders that show UI use it to
/// avoid prompting twice in one termination cycle.
pub trait TerminationDecider {
    /// Vote on the pending termination.
    fn should_terminate(&mut self, is_async: bool) -> TerminationQuery;

    /// Short name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A decider backed by a closure.
///
/// ```
/// use quitguard_core::{FnDecider, TerminationDecider, TerminationQuery};
///
/// let mut decider = FnDecider::new("always-next", |_is_async| TerminationQuery::next());
/// assert!(decider.should_terminate(false).as_sync().is_some());
/// ```
pub struct FnDecider<F> {
    name: &'static str,
    decide: F,
}

impl<F> FnDecider<F>
where
    F: FnMut(bool) -> TerminationQuery,
{
    /// Create a decider that calls `decide` with the `is_async` flag.
    pub fn new(name: &'static str, decide: F) -> Self {
        Self { name, decide }
    }
}

impl<F> TerminationDecider for FnDecider<F>
where
    F: FnMut(bool) -> TerminationQuery,
{
    fn should_terminate(&mut self, is_async: bool) -> TerminationQuery {
        (self.decide)(is_async)
    }

    fn name(&self) -> &str {
        self.name
    }
}
