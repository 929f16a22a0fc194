//! Binds one data consumer's lifecycle to a refresh scope.
//!
//! A consumer calls [`RefreshBinding::bind`] on every render with its key,
//! its refresh callback and a change signal. The binding re-registers only
//! when the key or the signal changed, and unregisters once when it is
//! deactivated or dropped.

use std::sync::Arc;

use super::callback::{MaybeAsync, RefreshCallback};
use super::registry::RefreshRegistry;

/// Registration surface a binding needs from its scope.
pub trait RefreshScope {
    fn register(&self, key: &str, callback: RefreshCallback);
    fn unregister(&self, key: &str);
    fn generation(&self) -> u64;
}

impl RefreshScope for RefreshRegistry {
    fn register(&self, key: &str, callback: RefreshCallback) {
        RefreshRegistry::register(self, key, callback);
    }

    fn unregister(&self, key: &str) {
        RefreshRegistry::unregister(self, key);
    }

    fn generation(&self) -> u64 {
        RefreshRegistry::generation(self)
    }
}

impl<T: RefreshScope + ?Sized> RefreshScope for Arc<T> {
    fn register(&self, key: &str, callback: RefreshCallback) {
        (**self).register(key, callback);
    }

    fn unregister(&self, key: &str) {
        (**self).unregister(key);
    }

    fn generation(&self) -> u64 {
        (**self).generation()
    }
}

/// What a consumer reads back after binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingState {
    /// Scope generation; use it as a render key to remount after sweeps.
    pub generation: u64,
}

#[derive(Debug)]
struct Bound<S> {
    key: String,
    signal: Vec<S>,
}

/// Keeps one consumer registered under its current key.
///
/// `S` is the element type of the change signal, compared by value.
#[derive(Debug)]
pub struct RefreshBinding<S, R: RefreshScope = RefreshRegistry> {
    scope: R,
    bound: Option<Bound<S>>,
}

impl<S, R> RefreshBinding<S, R>
where
    S: PartialEq + Clone,
    R: RefreshScope,
{
    pub fn new(scope: R) -> Self {
        Self { scope, bound: None }
    }

    /// Registers `on_refresh` under `key` if this is the first bind, or if
    /// the key or `change_signal` differs from the previous bind.
    ///
    /// A key change unregisters the previous key first. When nothing
    /// changed, the previously registered callback stays in place.
    pub fn bind<F>(
        &mut self,
        key: impl Into<String>,
        on_refresh: F,
        change_signal: &[S],
    ) -> BindingState
    where
        F: Fn() -> MaybeAsync + Send + Sync + 'static,
    {
        let key = key.into();
        let changed = self
            .bound
            .as_ref()
            .is_none_or(|bound| bound.key != key || bound.signal.as_slice() != change_signal);

        if changed {
            if let Some(previous) = self.bound.take()
                && previous.key != key
            {
                self.scope.unregister(&previous.key);
            }
            self.scope.register(&key, Arc::new(on_refresh));
            self.bound = Some(Bound {
                key,
                signal: change_signal.to_vec(),
            });
        }

        self.state()
    }
}

impl<S, R: RefreshScope> RefreshBinding<S, R> {
    /// Unregisters the current key. Safe to call repeatedly.
    pub fn deactivate(&mut self) {
        if let Some(bound) = self.bound.take() {
            self.scope.unregister(&bound.key);
        }
    }

    pub fn is_active(&self) -> bool {
        self.bound.is_some()
    }

    pub fn key(&self) -> Option<&str> {
        self.bound.as_ref().map(|bound| bound.key.as_str())
    }

    pub fn generation(&self) -> u64 {
        self.scope.generation()
    }

    pub fn state(&self) -> BindingState {
        BindingState {
            generation: self.generation(),
        }
    }

    pub fn scope(&self) -> &R {
        &self.scope
    }
}

impl<S, R: RefreshScope> Drop for RefreshBinding<S, R> {
    fn drop(&mut self) {
        self.deactivate();
    }
}
