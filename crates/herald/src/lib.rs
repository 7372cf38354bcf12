#![forbid(unsafe_code)]

//! Dirty-flag change notification with snapshot-isolated listener dispatch.
//!
//! # Design
//!
//! [`Subject<A>`] guards a changed flag and an ordered, duplicate-free
//! listener list behind a single mutex. [`Subject::notify_with`] copies the
//! listener list out under that mutex, clears the flag, and only then invokes
//! each [`Listener`] with the mutex released, in reverse registration order.
//! Callbacks may therefore run arbitrary code, including re-entrant subject
//! calls, without deadlocking the subject.
//!
//! The unlocked dispatch carries a deliberate race: a listener registered
//! after the snapshot misses the in-flight round, and a listener removed
//! after the snapshot still receives it. Callers that need exact membership
//! at delivery time must serialize registration against notification
//! themselves.
//!
//! Listeners are held weakly. Dropping the last strong reference to a
//! listener unregisters it; dead entries are pruned lazily and never invoked.
//!
//! ```
//! use std::sync::Arc;
//! use herald::{FnListener, Listener, Subject};
//!
//! let subject: Subject<String> = Subject::new();
//! let listener = FnListener::new(|_: &Subject<String>, arg: Option<&String>| {
//!     assert_eq!(arg.map(String::as_str), Some("reindexed"));
//! });
//! let listener: Arc<dyn Listener<String>> = listener;
//! subject.add_listener(Arc::downgrade(&listener))?;
//!
//! subject.mark_changed();
//! subject.notify_with(&"reindexed".to_string());
//! assert!(!subject.has_changed());
//! # Ok::<(), herald::SubjectError>(())
//! ```

pub mod listener;
pub mod subject;

pub use listener::{FnListener, Listener};
pub use subject::{Subject, SubjectError};
