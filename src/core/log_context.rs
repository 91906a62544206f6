//! Scoped contextual attributes
//!
//! Each thread owns a chain of context frames. Entering a scope captures the
//! current frame, overlays the new attributes on a copy and installs the
//! result; dropping the returned [`ContextGuard`] restores exactly the frame
//! that was current before entry, however the scope is left (normal return,
//! early return or unwinding panic).
//!
//! Frames never cross threads implicitly. To carry the current attributes to
//! a worker thread, take a [`ContextSnapshot`] and attach it there.

use super::attributes::Attributes;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    static CURRENT: RefCell<Arc<Attributes>> = RefCell::new(Arc::new(Attributes::new()));
}

/// Attributes visible to logging calls on this thread right now
pub fn current_context() -> Arc<Attributes> {
    CURRENT.with(|current| Arc::clone(&current.borrow()))
}

/// Enter a context scope overlaying `attrs` on the current frame
///
/// # Example
///
/// ```
/// use otel_logger_system::{current_context, log_context, Attributes};
///
/// {
///     let _guard = log_context(Attributes::new().with_field("request_id", "req-1"));
///     assert!(current_context().contains_key("request_id"));
/// }
/// assert!(!current_context().contains_key("request_id"));
/// ```
#[must_use = "the scope ends when the guard is dropped"]
pub fn log_context(attrs: Attributes) -> ContextGuard {
    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        let next = Arc::new(current.overlaid(&attrs));
        let previous = std::mem::replace(&mut *current, next);
        ContextGuard::new(previous)
    })
}

/// Run `f` with `attrs` overlaid on the current frame
pub fn with_log_context<R>(attrs: Attributes, f: impl FnOnce() -> R) -> R {
    let _guard = log_context(attrs);
    f()
}

/// RAII guard restoring the enclosing context frame when dropped
///
/// The guard is tied to the thread that created it and cannot be sent
/// elsewhere.
pub struct ContextGuard {
    previous: Option<Arc<Attributes>>,
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    fn new(previous: Arc<Attributes>) -> Self {
        Self {
            previous: Some(previous),
            _not_send: PhantomData,
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            // try_with: the thread-local may already be gone during thread teardown
            let _ = CURRENT.try_with(|current| {
                *current.borrow_mut() = previous;
            });
        }
    }
}

/// Immutable copy of a thread's current frame, for explicit hand-off
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    frame: Arc<Attributes>,
}

impl ContextSnapshot {
    pub fn capture() -> Self {
        Self {
            frame: current_context(),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        &self.frame
    }

    /// Install the snapshot as a scope on the calling thread
    #[must_use = "the scope ends when the guard is dropped"]
    pub fn attach(&self) -> ContextGuard {
        log_context((*self.frame).clone())
    }
}
