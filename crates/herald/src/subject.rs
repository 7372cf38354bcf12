#![forbid(unsafe_code)]

//! Subject: a changed flag plus an ordered listener list, with
//! snapshot-isolated notification.
//!
//! # Design
//!
//! All bookkeeping (the dirty flag, registration, removal, and the snapshot
//! phase of [`Subject::notify_with`]) serializes on one [`Mutex`]. The
//! dispatch phase runs with that mutex released: the snapshot is an owned
//! `Vec<Arc<dyn Listener>>`, so callbacks can re-enter the subject freely.
//! Lock hold time is O(listener count), for the snapshot copy only.
//!
//! Dispatch iterates the snapshot in **reverse registration order**: the most
//! recently registered listener hears about a change first.
//!
//! # Invariants
//!
//! 1. The listener list never holds two entries that are duplicates of one
//!    another (same allocation, or equal per [`Listener::same_as`]).
//! 2. The dirty flag is false immediately after construction and after any
//!    notification round that observed it true.
//! 3. The mutex is never held while a listener callback runs.
//! 4. Dead weak entries are pruned lazily; they are never invoked and never
//!    counted.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Dead registration | `Weak` with no live referent | `Err(DeadListener)`, no mutation |
//! | Listener panic | callback panics mid-round | propagates to the `notify` caller; later snapshot entries are skipped |
//! | Non-returning listener | callback blocks forever | `notify_with` blocks on the calling thread; all other operations stay usable |
//! | Poisoned mutex | panic while locked elsewhere | guard recovered via `PoisonError::into_inner` |

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::trace;

use crate::listener::Listener;

/// Errors from subject operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectError {
    /// Registration was handed a weak reference with no live referent.
    DeadListener,
}

impl fmt::Display for SubjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadListener => write!(f, "listener reference has no live referent"),
        }
    }
}

impl std::error::Error for SubjectError {}

/// Locked interior of a [`Subject`].
struct SubjectInner<A: 'static> {
    /// True iff `mark_changed` ran since the last completed notification
    /// decision.
    dirty: bool,
    /// Registration order. Dead entries are pruned on snapshot and count.
    listeners: Vec<Weak<dyn Listener<A>>>,
}

/// The entity whose state changes trigger notifications.
///
/// Cloning a `Subject` creates a new handle to the **same** inner state:
/// both handles share the dirty flag and the listener list.
///
/// `A` is the notification payload type, opaque to the subject. Listeners
/// receive it by reference, or `None` for a payload-free round.
pub struct Subject<A: 'static> {
    inner: Arc<Mutex<SubjectInner<A>>>,
}

// Manual Clone: shares the same inner state.
impl<A: 'static> Clone for Subject<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: 'static> Default for Subject<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> fmt::Debug for Subject<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Subject")
            .field("dirty", &inner.dirty)
            .field("listener_slots", &inner.listeners.len())
            .finish()
    }
}

impl<A: 'static> Subject<A> {
    /// Create a subject with no listeners and the dirty flag clear.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubjectInner {
                dirty: false,
                listeners: Vec::new(),
            })),
        }
    }

    /// Callbacks run unlocked, so a panicking listener cannot poison this
    /// mutex. If some unrelated panic did, the flag-and-pointer state cannot
    /// be torn; recover the guard instead of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, SubjectInner<A>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener at the end of the notification order.
    ///
    /// The subject stores only the weak reference; the caller keeps the
    /// strong one. Registering a listener already present (same allocation,
    /// or equal per [`Listener::same_as`]) is a no-op.
    ///
    /// # Errors
    ///
    /// [`SubjectError::DeadListener`] if `listener` has no live referent.
    /// Nothing is mutated in that case.
    pub fn add_listener(&self, listener: Weak<dyn Listener<A>>) -> Result<(), SubjectError> {
        let candidate = listener.upgrade().ok_or(SubjectError::DeadListener)?;
        let mut inner = self.lock();
        let duplicate = inner.listeners.iter().any(|slot| {
            Weak::ptr_eq(slot, &listener)
                || slot
                    .upgrade()
                    .is_some_and(|held| candidate.same_as(held.as_ref()))
        });
        if !duplicate {
            inner.listeners.push(listener);
            trace!(listeners = inner.listeners.len(), "listener registered");
        }
        Ok(())
    }

    /// Remove a listener if present; absent or dead references are accepted
    /// silently.
    ///
    /// Matching follows the same scheme as registration: allocation identity
    /// first, then [`Listener::same_as`].
    pub fn remove_listener(&self, listener: Weak<dyn Listener<A>>) {
        let candidate = listener.upgrade();
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|slot| {
            let matched = Weak::ptr_eq(slot, &listener)
                || match (&candidate, slot.upgrade()) {
                    (Some(candidate), Some(held)) => candidate.same_as(held.as_ref()),
                    _ => false,
                };
            !matched
        });
        if inner.listeners.len() != before {
            trace!(listeners = inner.listeners.len(), "listener removed");
        }
    }

    /// Clear the listener list. The dirty flag is untouched.
    pub fn remove_all_listeners(&self) {
        let mut inner = self.lock();
        inner.listeners.clear();
        trace!("all listeners removed");
    }

    /// Mark this subject as having changed; [`has_changed`](Self::has_changed)
    /// now returns true and the next notification round will dispatch.
    pub fn mark_changed(&self) {
        self.lock().dirty = true;
    }

    /// Reset the dirty flag without notifying anyone.
    pub fn clear_changed(&self) {
        self.lock().dirty = false;
    }

    /// True iff `mark_changed` ran more recently than `clear_changed` or a
    /// dispatching notification round.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.lock().dirty
    }

    /// Number of live registered listeners. Dead entries are pruned, not
    /// counted.
    #[must_use]
    pub fn count_listeners(&self) -> usize {
        let mut inner = self.lock();
        inner.listeners.retain(|w| w.strong_count() > 0);
        inner.listeners.len()
    }

    /// Notify without a payload; listeners receive `None`.
    ///
    /// Equivalent to a [`notify_with`](Self::notify_with) round with no
    /// argument. See that method for the full semantics.
    pub fn notify(&self) {
        self.dispatch(None);
    }

    /// If the dirty flag is set: snapshot the listener list, clear the flag,
    /// and invoke every snapshotted listener with `arg`, synchronously, on
    /// the calling thread, in reverse registration order. If the flag is
    /// clear, this is a no-op.
    ///
    /// The snapshot is taken under the mutex; the callbacks run outside it.
    /// A listener registered after the snapshot misses this round; a listener
    /// removed after the snapshot still receives it. That race is the price
    /// of never holding the lock across arbitrary callback code, and is part
    /// of the contract.
    ///
    /// A panic from a listener propagates to the caller and skips the rest of
    /// the round. The flag stays cleared.
    pub fn notify_with(&self, arg: &A) {
        self.dispatch(Some(arg));
    }

    fn dispatch(&self, arg: Option<&A>) {
        let snapshot: Vec<Arc<dyn Listener<A>>> = {
            let mut inner = self.lock();
            if !inner.dirty {
                return;
            }
            // Prune dead entries and pin the survivors for unlocked dispatch.
            inner.listeners.retain(|w| w.strong_count() > 0);
            let snapshot = inner.listeners.iter().filter_map(Weak::upgrade).collect();
            inner.dirty = false;
            snapshot
        };
        trace!(listeners = snapshot.len(), "dispatching notification round");
        for listener in snapshot.iter().rev() {
            listener.on_update(self, arg);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
