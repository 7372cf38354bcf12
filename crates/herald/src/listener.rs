#![forbid(unsafe_code)]

//! Listener capability and closure adapter.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::subject::Subject;

/// A notification target registered with a [`Subject`].
///
/// The only required operation is [`on_update`](Listener::on_update), invoked
/// synchronously on whatever thread called [`Subject::notify_with`]. The
/// payload `arg` is opaque to the subject and may be absent.
///
/// Implementations must be `Send + Sync`: callbacks can be delivered from any
/// thread, and the subject's listener list is shared across threads.
pub trait Listener<A: 'static>: Any + Send + Sync {
    /// Called once per notification round the listener was snapshotted into.
    fn on_update(&self, subject: &Subject<A>, arg: Option<&A>);

    /// Equality hook for duplicate suppression and removal matching.
    ///
    /// The subject always treats two registrations of the same allocation as
    /// duplicates; this hook extends that to listener-defined equality. The
    /// provided body reports no match, so the default scheme is pure pointer
    /// identity. Types that want value-based suppression override it and
    /// downcast `other` through the `Any` supertrait.
    ///
    /// Unlike [`on_update`](Listener::on_update), this hook runs with the
    /// subject's lock held: it must not call back into the subject.
    ///
    /// ```
    /// use std::any::Any;
    /// use herald::{Listener, Subject};
    ///
    /// struct Keyed {
    ///     key: u32,
    /// }
    ///
    /// impl Listener<()> for Keyed {
    ///     fn on_update(&self, _subject: &Subject<()>, _arg: Option<&()>) {}
    ///
    ///     fn same_as(&self, other: &dyn Listener<()>) -> bool {
    ///         let other: &dyn Any = other;
    ///         other.downcast_ref::<Self>().is_some_and(|o| o.key == self.key)
    ///     }
    /// }
    /// ```
    fn same_as(&self, other: &dyn Listener<A>) -> bool {
        let _ = other;
        false
    }
}

/// Type-erased update callback stored by [`FnListener`].
type UpdateFn<A> = dyn Fn(&Subject<A>, Option<&A>) + Send + Sync;

/// Closure adapter: registers a plain function as a [`Listener`].
///
/// [`FnListener::new`] returns an [`Arc`] because the caller owns the strong
/// reference; the subject keeps only a weak one. Dropping every clone of the
/// returned `Arc` unregisters the closure before the next snapshot.
pub struct FnListener<A: 'static> {
    f: Box<UpdateFn<A>>,
}

impl<A: 'static> FnListener<A> {
    /// Wrap a closure as a registerable listener.
    #[must_use]
    pub fn new(f: impl Fn(&Subject<A>, Option<&A>) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self { f: Box::new(f) })
    }
}

impl<A: 'static> Listener<A> for FnListener<A> {
    fn on_update(&self, subject: &Subject<A>, arg: Option<&A>) {
        (self.f)(subject, arg);
    }
}

impl<A: 'static> fmt::Debug for FnListener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener").finish_non_exhaustive()
    }
}
