//! Resource handles with idempotent release.
//!
//! Every handle in this module follows the same contract: `dispose` may be
//! called any number of times from any thread and releases the underlying
//! resource at most once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::cancellation::CancellationToken;

/// An idempotent release capability.
pub trait Disposable: Send + Sync {
    /// Release the resource. Calling this more than once is a no-op.
    fn dispose(&self);

    /// Whether [`Disposable::dispose`] has been called.
    fn is_disposed(&self) -> bool;
}

/// Shared, type-erased resource handle.
pub type Handle = Arc<dyn Disposable>;

/// A handle that holds nothing.
#[must_use]
pub fn empty() -> Handle {
    Arc::new(BooleanDisposable::new())
}

/// A handle that only tracks its disposed flag.
#[derive(Debug, Default)]
pub struct BooleanDisposable {
    disposed: AtomicBool,
}

impl BooleanDisposable {
    /// Create an undisposed flag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            disposed: AtomicBool::new(false),
        }
    }
}

impl Disposable for BooleanDisposable {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Runs a closure the first time it is disposed.
pub struct ActionDisposable {
    action: Mutex<Option<Box<dyn FnOnce() + Send + 'static>>>,
}

impl ActionDisposable {
    /// Wrap `action` so that it runs on first disposal.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }
}

impl Disposable for ActionDisposable {
    fn dispose(&self) {
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    fn is_disposed(&self) -> bool {
        self.action.lock().is_none()
    }
}

struct Slot {
    disposed: bool,
    current: Option<Handle>,
}

/// Exclusive slot owning at most one inner handle.
///
/// [`SerialDisposable::replace`] installs a new occupant and disposes the
/// previous one in a single step; once the slot itself is disposed every
/// later occupant is disposed on arrival.
pub struct SerialDisposable {
    slot: Mutex<Slot>,
}

impl SerialDisposable {
    /// Create an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                disposed: false,
                current: None,
            }),
        }
    }

    /// Install `next` (or clear the slot with `None`), disposing the previous occupant.
    ///
    /// If the slot is already disposed, `next` is disposed immediately and
    /// never becomes the occupant.
    pub fn replace(&self, next: Option<Handle>) {
        if let Some(displaced) = self.swap(next) {
            displaced.dispose();
        }
    }

    /// Install `next` without disposing anything, returning the handle the
    /// caller must dispose.
    ///
    /// That is the previous occupant, or `next` itself when the slot is
    /// already disposed. Lets callers swap under their own lock and release
    /// after unlocking.
    #[must_use = "the displaced handle must be disposed"]
    pub fn swap(&self, next: Option<Handle>) -> Option<Handle> {
        let mut slot = self.slot.lock();
        if slot.disposed {
            return next;
        }
        std::mem::replace(&mut slot.current, next)
    }

    /// Whether the slot currently holds an occupant.
    pub fn is_occupied(&self) -> bool {
        self.slot.lock().current.is_some()
    }
}

impl Default for SerialDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for SerialDisposable {
    fn dispose(&self) {
        let current = {
            let mut slot = self.slot.lock();
            if slot.disposed {
                return;
            }
            slot.disposed = true;
            slot.current.take()
        };
        if let Some(current) = current {
            current.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.slot.lock().disposed
    }
}

struct SingleSlot {
    disposed: bool,
    assigned: bool,
    current: Option<Handle>,
}

/// Slot that accepts exactly one occupant.
///
/// A second assignment is refused: the surplus handle is disposed and
/// `set` returns `false`.
pub struct SingleAssignmentDisposable {
    slot: Mutex<SingleSlot>,
}

impl SingleAssignmentDisposable {
    /// Create an unassigned slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(SingleSlot {
                disposed: false,
                assigned: false,
                current: None,
            }),
        }
    }

    /// Assign the occupant. Returns `false` if one was already assigned.
    pub fn set(&self, handle: Handle) -> bool {
        let mut slot = self.slot.lock();
        if slot.assigned {
            drop(slot);
            tracing::warn!("single-assignment slot already assigned; disposing surplus handle");
            handle.dispose();
            return false;
        }
        slot.assigned = true;
        if slot.disposed {
            drop(slot);
            handle.dispose();
            return true;
        }
        slot.current = Some(handle);
        true
    }
}

impl Default for SingleAssignmentDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for SingleAssignmentDisposable {
    fn dispose(&self) {
        let current = {
            let mut slot = self.slot.lock();
            if slot.disposed {
                return;
            }
            slot.disposed = true;
            slot.current.take()
        };
        if let Some(current) = current {
            current.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.slot.lock().disposed
    }
}

/// A set of handles disposed together, exactly once.
pub struct CompositeDisposable {
    members: Mutex<Option<Vec<Handle>>>,
}

impl CompositeDisposable {
    /// Aggregate `members`.
    #[must_use]
    pub fn new(members: Vec<Handle>) -> Self {
        Self {
            members: Mutex::new(Some(members)),
        }
    }

    /// Add a member. If the composite is already disposed the member is disposed now.
    pub fn add(&self, member: Handle) {
        let mut members = self.members.lock();
        if let Some(list) = members.as_mut() {
            list.push(member);
            return;
        }
        drop(members);
        member.dispose();
    }
}

impl Disposable for CompositeDisposable {
    fn dispose(&self) {
        let members = self.members.lock().take();
        for member in members.into_iter().flatten() {
            member.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.members.lock().is_none()
    }
}

/// A handle whose disposal cancels a [`CancellationToken`] it owns.
#[derive(Debug, Default)]
pub struct CancellationDisposable {
    token: CancellationToken,
}

impl CancellationDisposable {
    /// Create a handle with a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// The token cancelled by this handle's disposal.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Disposable for CancellationDisposable {
    fn dispose(&self) {
        self.token.cancel();
    }

    fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }
}
