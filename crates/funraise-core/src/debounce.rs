//! Trailing-edge debounce.
//!
//! [`Debounced`] coalesces a burst of calls into one invocation made after
//! `delay` of quiet, using the arguments of the last call. Invocations run on
//! a spawned tokio task, never inline in the caller, even with a zero delay.
//!
//! A call supersedes the pending invocation unless that invocation's
//! deadline has already been reached: a call made exactly `delay` after the
//! previous one lets the previous invocation fire and schedules its own.
//!
//! Calling the wrapper from inside the wrapped function is allowed and
//! schedules a fresh invocation.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Debounced wrapper around `Fn(A)`.
///
/// Use `A = ()` for zero-argument functions and a tuple for several
/// arguments. Clones share the same pending invocation.
pub struct Debounced<A> {
    shared: Arc<Shared<A>>,
}

struct Shared<A> {
    delay: Duration,
    handle: Handle,
    f: Box<dyn Fn(A) + Send + Sync>,
    /// Scheduled invocations not yet fired or cancelled. Holds more than
    /// one only when a call arrived after the previous deadline was reached.
    pending: Mutex<Vec<Pending>>,
    next_id: AtomicU64,
}

struct Pending {
    id: u64,
    deadline: Instant,
    cancel: CancellationToken,
}

/// Shorthand for [`Debounced::new`].
///
/// # Panics
/// Panics if called outside a tokio runtime.
pub fn debounce<A, F>(delay: Duration, f: F) -> Debounced<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Debounced::new(delay, f)
}

impl<A: Send + 'static> Debounced<A> {
    /// Wraps `f`, scheduling invocations on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn new<F>(delay: Duration, f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_handle(Handle::current(), delay, f)
    }

    /// Wraps `f`, scheduling invocations on `handle`.
    pub fn with_handle<F>(handle: Handle, delay: Duration, f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                delay,
                handle,
                f: Box::new(f),
                pending: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Records `args` and (re)starts the quiet window.
    pub fn call(&self, args: A) {
        let now = Instant::now();
        let deadline = now + self.shared.delay;
        let cancel = CancellationToken::new();
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut pending = self.shared.pending();
            // A zero delay never counts as elapsed between two calls.
            let zero = self.shared.delay.is_zero();
            pending.retain(|previous| {
                if zero || previous.deadline > now {
                    previous.cancel.cancel();
                    tracing::trace!(id = previous.id, "debounced call superseded");
                    false
                } else {
                    true
                }
            });
            pending.push(Pending {
                id,
                deadline,
                cancel: cancel.clone(),
            });
        }

        let shared = Arc::clone(&self.shared);
        self.shared.handle.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = sleep_until(deadline) => shared.fire(id, args),
            }
        });
    }
}

impl<A> Debounced<A> {
    /// Drops every pending invocation without firing it, including one
    /// whose deadline was reached but that has not run yet.
    ///
    /// Returns whether any was pending.
    pub fn cancel(&self) -> bool {
        let cancelled = mem::take(&mut *self.shared.pending());
        for pending in &cancelled {
            pending.cancel.cancel();
            tracing::trace!(id = pending.id, "debounced call cancelled");
        }
        !cancelled.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        !self.shared.pending().is_empty()
    }

    pub fn delay(&self) -> Duration {
        self.shared.delay
    }
}

impl<A> Shared<A> {
    fn fire(&self, id: u64, args: A) {
        self.pending().retain(|p| p.id != id);
        tracing::trace!(id, "debounced call fired");
        (self.f)(args);
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> Clone for Debounced<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A> fmt::Debug for Debounced<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounced")
            .field("delay", &self.shared.delay)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}
