//! Drives an ordered list of [`TerminationDecider`]s and turns their votes
//! into a single reply to the platform's "should the application terminate?"
//! query.

use crate::decision::{TerminationDecider, TerminationDecision, TerminationQuery};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// The immediate answer to the platform's termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReply {
    /// Terminate right away.
    TerminateNow,
    /// Do not terminate.
    TerminateCancel,
    /// The answer will be delivered later through
    /// [`TerminationReplySink::reply_to_should_terminate`].
    TerminateLater,
}

/// The platform side of a deferred termination request.
///
/// After the handler returned [`TerminationReply::TerminateLater`], the final
/// verdict is delivered here exactly once.
pub trait TerminationReplySink {
    /// Tell the platform whether termination may proceed.
    fn reply_to_should_terminate(&self, should_terminate: bool);
}

/// An ordered, per-attempt list of deciders.
pub type DeciderList = VecDeque<Box<dyn TerminationDecider>>;

type FinishHook = Box<dyn FnOnce(bool)>;

/// Executes termination deciders in order, suspending at `Async` queries.
///
/// The handler is a cheap [`Clone`] handle; clones share the in-flight flag,
/// so at most one termination chain is pending at a time. A second top-level
/// request that arrives while a chain is pending is answered
/// [`TerminateLater`](TerminationReply::TerminateLater) without running any
/// decider.
///
/// # Example
///
/// ```rust,ignore
/// let handler = TerminationDeciderHandler::new(Rc::new(platform));
/// let reply = handler.execute_deciders(chain.build(), false);
/// ```
#[derive(Clone)]
pub struct TerminationDeciderHandler {
    inner: Rc<HandlerInner>,
}

struct HandlerInner {
    in_flight: Cell<bool>,
    reply_sink: Rc<dyn TerminationReplySink>,
    // Registered for the next top-level request.
    queued_hooks: RefCell<Vec<FinishHook>>,
    // Owned by the chain currently running.
    chain_hooks: RefCell<Vec<FinishHook>>,
}

impl TerminationDeciderHandler {
    /// Create a handler that delivers deferred replies to `reply_sink`.
    pub fn new(reply_sink: Rc<dyn TerminationReplySink>) -> Self {
        Self {
            inner: Rc::new(HandlerInner {
                in_flight: Cell::new(false),
                reply_sink,
                queued_hooks: RefCell::new(Vec::new()),
                chain_hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Whether a deferred decider is currently pending.
    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.get()
    }

    /// Register a hook that runs once, when the next chain reaches its final
    /// decision. The hook receives `true` if the application will terminate.
    ///
    /// The hook belongs to the next top-level
    /// [`execute_deciders`](Self::execute_deciders) call. If that request is
    /// rejected because another chain is pending, the hook is dropped
    /// without running.
    pub fn on_finish(&self, hook: impl FnOnce(bool) + 'static) {
        self.inner.queued_hooks.borrow_mut().push(Box::new(hook));
    }

    /// Run `deciders` in order and return the platform reply.
    ///
    /// `is_async` must be `false` for a fresh request from the platform; the
    /// handler passes `true` itself when it continues a chain after a
    /// deferred decider resolved.
    ///
    /// # Panics
    ///
    /// A deferred decider is awaited on a task spawned with
    /// [`tokio::task::spawn_local`], so this must be called from within a
    /// [`tokio::task::LocalSet`] whenever a decider may return
    /// [`TerminationQuery::Async`].
    pub fn execute_deciders(&self, mut deciders: DeciderList, is_async: bool) -> TerminationReply {
        if !is_async {
            let queued = std::mem::take(&mut *self.inner.queued_hooks.borrow_mut());
            if self.inner.in_flight.get() {
                tracing::debug!(
                    dropped_hooks = queued.len(),
                    "termination already in flight; rejecting reentrant request"
                );
                return TerminationReply::TerminateLater;
            }
            *self.inner.chain_hooks.borrow_mut() = queued;
        }

        while let Some(mut decider) = deciders.pop_front() {
            match decider.should_terminate(is_async) {
                TerminationQuery::Sync(TerminationDecision::Next) => {
                    tracing::trace!(decider = decider.name(), "decider voted next");
                }
                TerminationQuery::Sync(TerminationDecision::Cancel) => {
                    tracing::info!(decider = decider.name(), is_async, "termination cancelled");
                    self.finish(false, is_async);
                    return TerminationReply::TerminateCancel;
                }
                TerminationQuery::Async(pending) => {
                    tracing::debug!(
                        decider = decider.name(),
                        remaining = deciders.len(),
                        "decider deferred; replying terminate-later"
                    );
                    self.inner.in_flight.set(true);
                    let handler = self.clone();
                    tokio::task::spawn_local(async move {
                        let decision = pending.await;
                        handler.inner.in_flight.set(false);
                        match decision {
                            TerminationDecision::Next => {
                                handler.execute_deciders(deciders, true);
                            }
                            TerminationDecision::Cancel => {
                                tracing::info!("deferred decider cancelled termination");
                                handler.finish(false, true);
                            }
                        }
                    });
                    return TerminationReply::TerminateLater;
                }
            }
        }

        tracing::info!(is_async, "all deciders agreed; terminating");
        self.finish(true, is_async);
        TerminationReply::TerminateNow
    }

    fn finish(&self, should_terminate: bool, is_async: bool) {
        let hooks = std::mem::take(&mut *self.inner.chain_hooks.borrow_mut());
        for hook in hooks {
            hook(should_terminate);
        }
        if is_async {
            self.inner.reply_sink.reply_to_should_terminate(should_terminate);
        }
    }
}
