//! The application-wide "first refusal" hook on native input.
//!
//! Exactly one owner at a time may install a hook. The slot is an ordinary
//! value owned by the application's dispatch layer and shared by cloning,
//! never ambient global state.

use crate::event::InputEvent;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Identifies the owner of the interceptor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerToken(Uuid);

impl OwnerToken {
    /// A fresh, unique token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An interceptor callback.
///
/// Returns `None` to consume (swallow) the event or `Some(event)` to let it
/// continue to the rest of the UI.
pub type InterceptHook = Box<dyn FnMut(InputEvent) -> Option<InputEvent>>;

#[derive(Default)]
struct SlotState {
    owner: Option<OwnerToken>,
    hook: Option<InterceptHook>,
}

/// Single-slot registry for the global event interceptor.
///
/// The application's event loop passes every native event through
/// [`dispatch`](InterceptorSlot::dispatch) before routing it to the UI.
///
/// A hook is taken out of the slot while it runs, so it may release the slot
/// or pump the event queue from inside the callback.
#[derive(Clone, Default)]
pub struct InterceptorSlot {
    state: Rc<RefCell<SlotState>>,
}

impl InterceptorSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `hook` on behalf of `token`.
    ///
    /// Returns `false`, leaving the current hook in place, if another owner
    /// holds the slot. Re-acquiring with the same token replaces the hook.
    pub fn acquire(&self, token: OwnerToken, hook: InterceptHook) -> bool {
        let mut state = self.state.borrow_mut();
        match state.owner {
            Some(owner) if owner != token => {
                tracing::debug!(%owner, requester = %token, "interceptor slot occupied; refusing");
                false
            }
            _ => {
                tracing::trace!(%token, "interceptor installed");
                state.owner = Some(token);
                state.hook = Some(hook);
                true
            }
        }
    }

    /// Remove the hook.
    ///
    /// With `Some(token)` the release is honored only if `token` owns the
    /// slot; `None` force-clears it. Returns whether the slot was cleared.
    pub fn release(&self, token: Option<OwnerToken>) -> bool {
        let mut state = self.state.borrow_mut();
        match (state.owner, token) {
            (None, _) => false,
            (Some(owner), Some(token)) if owner != token => {
                tracing::debug!(%owner, requester = %token, "ignoring release from non-owner");
                false
            }
            (Some(owner), _) => {
                tracing::trace!(%owner, "interceptor removed");
                state.owner = None;
                state.hook = None;
                true
            }
        }
    }

    /// Whether any hook is installed.
    pub fn is_occupied(&self) -> bool {
        self.state.borrow().owner.is_some()
    }

    /// The current owner, if any.
    pub fn owner(&self) -> Option<OwnerToken> {
        self.state.borrow().owner
    }

    /// Offer `event` to the installed hook.
    ///
    /// Returns the event to deliver to the UI, or `None` if it was consumed.
    /// With no hook installed the event passes through untouched.
    pub fn dispatch(&self, event: InputEvent) -> Option<InputEvent> {
        let (owner, hook) = {
            let mut state = self.state.borrow_mut();
            (state.owner, state.hook.take())
        };
        let (Some(owner), Some(mut hook)) = (owner, hook) else {
            return Some(event);
        };

        let result = hook(event);

        let mut state = self.state.borrow_mut();
        if state.owner == Some(owner) && state.hook.is_none() {
            state.hook = Some(hook);
        }
        result
    }
}
