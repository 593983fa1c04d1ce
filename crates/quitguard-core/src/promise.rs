//! A future that can be resolved from several call sites, exactly once.
//!
//! A pending confirmation can be settled by an event hook, a timer, or a
//! deferred click handler, whichever comes first. Every site holds a
//! [`Resolver`] clone; the first [`resolve`](Resolver::resolve) wins and the
//! rest are no-ops.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Every [`Resolver`] was dropped before a value was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("promise abandoned without a value")]
pub struct Abandoned;

/// Create a linked resolver / promise pair.
///
/// ```
/// # tokio_test_block_on(async {
/// let (resolver, promise) = quitguard_core::promise::pending::<bool>();
/// assert!(resolver.resolve(true));
/// assert!(!resolver.resolve(false));
/// assert_eq!(promise.await, Ok(true));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub fn pending<T>() -> (Resolver<T>, Promise<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        Resolver {
            sender: Rc::new(RefCell::new(Some(sender))),
        },
        Promise { receiver },
    )
}

/// The write side of a [`Promise`]. Cheap to clone.
pub struct Resolver<T> {
    sender: Rc<RefCell<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> Resolver<T> {
    /// Deliver `value`. Returns `true` only for the call that actually
    /// resolved the promise.
    pub fn resolve(&self, value: T) -> bool {
        match self.sender.borrow_mut().take() {
            // A dropped promise still counts as resolved: the value is
            // simply discarded.
            Some(sender) => {
                let _ = sender.send(value);
                true
            }
            None => false,
        }
    }

    /// Whether some resolver already delivered a value.
    pub fn is_resolved(&self) -> bool {
        self.sender.borrow().is_none()
    }
}

/// The read side: a future yielding the first resolved value.
pub struct Promise<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Future for Promise<T> {
    type Output = Result<T, Abandoned>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|result| result.map_err(|_| Abandoned))
    }
}
