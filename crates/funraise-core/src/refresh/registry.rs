//! Keyed registry of refresh callbacks.
//!
//! One registry serves one screen scope. Consumers register a callback under
//! a unique key while mounted. A pull gesture runs every registered callback
//! concurrently (a sweep), waits until all of them settled, then bumps the
//! generation counter once so dependent views can re-key.
//!
//! ## Sweep semantics
//!
//! - The callback set is snapshotted when the sweep starts. Registrations
//!   added or removed mid-sweep only affect the next sweep.
//! - Every callback settles independently: errors and panics are collected
//!   into the [`SweepReport`] and logged, never propagated.
//! - Sweeps are single-flight. Calling `run_refresh` while one is in flight
//!   waits for it and returns its report. If that sweep is dropped before
//!   finishing, the waiting caller runs a sweep of its own.
//! - `is_refreshing` is reset by a drop guard, so it also clears when the
//!   sweep future is dropped before completion.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio::sync::watch;

use super::callback::{CallbackFailure, RefreshCallback, SweepReport, panic_message};
use super::focus::FocusPolicy;

/// Cloneable handle to a refresh scope. Clones share the same state.
#[derive(Clone)]
pub struct RefreshRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    registrations: Mutex<HashMap<String, RefreshCallback>>,
    generation: watch::Sender<u64>,
    refreshing: watch::Sender<bool>,
    last_report: Mutex<SweepReport>,
    /// Sweeps that ran to completion; joiners compare it to tell a finished
    /// sweep from a dropped one.
    completed: AtomicU64,
}

impl Default for RefreshRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshRegistry {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        let (refreshing, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                registrations: Mutex::new(HashMap::new()),
                generation,
                refreshing,
                last_report: Mutex::new(SweepReport::default()),
                completed: AtomicU64::new(0),
            }),
        }
    }

    /// Inserts or replaces the callback for `key`. Empty keys are ignored.
    pub fn register(&self, key: impl Into<String>, callback: RefreshCallback) {
        let key = key.into();
        if key.is_empty() {
            tracing::warn!("ignoring refresh registration with an empty key");
            return;
        }
        let replaced = self.registrations().insert(key.clone(), callback).is_some();
        tracing::debug!(key = %key, replaced, "registered refresh callback");
    }

    /// Removes the callback for `key`; absent keys are a no-op.
    pub fn unregister(&self, key: &str) {
        if self.registrations().remove(key).is_some() {
            tracing::debug!(key, "unregistered refresh callback");
        }
    }

    /// Bumps the generation without running any callback.
    ///
    /// Returns the new generation.
    pub fn trigger_refresh(&self) -> u64 {
        let mut next = 0;
        self.inner.generation.send_modify(|generation| {
            *generation += 1;
            next = *generation;
        });
        tracing::trace!(generation = next, "generation bumped");
        next
    }

    /// Runs one sweep over every registered callback.
    ///
    /// Never fails: the returned report lists the callbacks that errored or
    /// panicked.
    pub async fn run_refresh(&self) -> SweepReport {
        loop {
            // Read before trying to start so a sweep finishing in between
            // is either joined or followed by our own.
            let completed = self.inner.completed.load(Ordering::Acquire);

            if self.try_start() {
                let _guard = RefreshingGuard(&self.inner.refreshing);
                return self.sweep().await;
            }

            tracing::debug!("refresh sweep already in flight, joining it");
            let mut rx = self.inner.refreshing.subscribe();
            // The sender is owned by `inner`, so the channel stays open.
            let _ = rx.wait_for(|refreshing| !*refreshing).await;

            if self.inner.completed.load(Ordering::Acquire) != completed {
                return self.last_report();
            }
            tracing::debug!("joined refresh sweep was dropped, starting a new one");
        }
    }

    fn try_start(&self) -> bool {
        self.inner.refreshing.send_if_modified(|refreshing| {
            if *refreshing {
                false
            } else {
                *refreshing = true;
                true
            }
        })
    }

    /// Body of a sweep. The caller holds the refreshing flag.
    async fn sweep(&self) -> SweepReport {
        let snapshot = match panic::catch_unwind(AssertUnwindSafe(|| self.snapshot())) {
            Ok(snapshot) => snapshot,
            Err(payload) => {
                tracing::error!(
                    error = %panic_message(payload.as_ref()),
                    "failed to snapshot refresh callbacks"
                );
                Vec::new()
            }
        };
        let invoked = snapshot.len();
        tracing::debug!(invoked, "refresh sweep started");

        let settled = join_all(
            snapshot
                .into_iter()
                .map(|(key, callback)| settle(key, callback)),
        )
        .await;

        let failures: Vec<CallbackFailure> = settled.into_iter().flatten().collect();
        for failure in &failures {
            tracing::warn!(
                key = %failure.key,
                kind = ?failure.kind,
                error = %failure.message,
                "refresh callback did not settle cleanly"
            );
        }

        let generation = self.trigger_refresh();
        let report = SweepReport {
            generation,
            invoked,
            failures,
        };
        *lock(&self.inner.last_report) = report.clone();
        self.inner.completed.fetch_add(1, Ordering::Release);

        tracing::debug!(
            generation,
            invoked,
            failed = report.failures.len(),
            "refresh sweep finished"
        );
        report
    }

    /// Applies `policy` for a navigation focus event.
    ///
    /// Returns the generation afterwards.
    pub async fn on_focus(&self, policy: FocusPolicy) -> u64 {
        tracing::debug!(policy = %policy, "screen focused");
        match policy {
            FocusPolicy::Sweep => self.run_refresh().await.generation,
            FocusPolicy::Rekey => self.trigger_refresh(),
            FocusPolicy::Ignore => self.generation(),
        }
    }

    pub fn generation(&self) -> u64 {
        *self.inner.generation.borrow()
    }

    pub fn is_refreshing(&self) -> bool {
        *self.inner.refreshing.borrow()
    }

    /// Watches generation changes, e.g. to remount child lists.
    pub fn subscribe_generation(&self) -> watch::Receiver<u64> {
        self.inner.generation.subscribe()
    }

    /// Watches the refreshing flag, e.g. to drive a spinner.
    pub fn subscribe_refreshing(&self) -> watch::Receiver<bool> {
        self.inner.refreshing.subscribe()
    }

    /// Report of the most recently completed sweep.
    pub fn last_report(&self) -> SweepReport {
        lock(&self.inner.last_report).clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.registrations().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.registrations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations().is_empty()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.registrations().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn snapshot(&self) -> Vec<(String, RefreshCallback)> {
        self.registrations()
            .iter()
            .map(|(key, callback)| (key.clone(), Arc::clone(callback)))
            .collect()
    }

    fn registrations(&self) -> MutexGuard<'_, HashMap<String, RefreshCallback>> {
        lock(&self.inner.registrations)
    }
}

impl fmt::Debug for RefreshRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRegistry")
            .field("keys", &self.keys())
            .field("generation", &self.generation())
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

struct RefreshingGuard<'a>(&'a watch::Sender<bool>);

impl Drop for RefreshingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

/// Invokes one callback and waits for it, catching errors and panics.
async fn settle(key: String, callback: RefreshCallback) -> Option<CallbackFailure> {
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
        Ok(outcome) => outcome,
        Err(payload) => return Some(CallbackFailure::panicked(&key, payload.as_ref())),
    };

    match AssertUnwindSafe(outcome.into_future()).catch_unwind().await {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(CallbackFailure::failed(&key, &err)),
        Err(payload) => Some(CallbackFailure::panicked(&key, payload.as_ref())),
    }
}

// Callbacks never run under these locks, so poisoning only means a panic in
// registry bookkeeping; the map itself is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
