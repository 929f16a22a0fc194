//! Refresh callback and sweep outcome types.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use serde::Serialize;

/// Future returned by an asynchronous refresh callback.
pub type RefreshFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A registered refresh callback.
///
/// Callbacks are shared with in-flight sweeps, so they may run once more
/// after their consumer unregistered. Guard any torn-down state inside the
/// closure.
pub type RefreshCallback = Arc<dyn Fn() -> MaybeAsync + Send + Sync>;

/// Wraps a closure as a [`RefreshCallback`].
pub fn callback<F>(f: F) -> RefreshCallback
where
    F: Fn() -> MaybeAsync + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Result of invoking a refresh callback: settled now, or a future that
/// settles later. The registry treats both the same way.
pub enum MaybeAsync {
    Ready(anyhow::Result<()>),
    Pending(RefreshFuture),
}

impl MaybeAsync {
    /// Completed synchronously without error.
    pub fn done() -> Self {
        Self::Ready(Ok(()))
    }

    /// Failed synchronously.
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        Self::Ready(Err(err.into()))
    }

    /// Settles when `fut` completes.
    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Pending(fut.boxed())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub(crate) fn into_future(self) -> RefreshFuture {
        match self {
            Self::Ready(result) => future::ready(result).boxed(),
            Self::Pending(fut) => fut,
        }
    }
}

impl From<anyhow::Result<()>> for MaybeAsync {
    fn from(result: anyhow::Result<()>) -> Self {
        Self::Ready(result)
    }
}

impl fmt::Debug for MaybeAsync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// How a refresh callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Returned an error, synchronously or from its future.
    Failed,
    /// Panicked while being invoked or polled.
    Panicked,
}

/// A callback that did not settle successfully during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackFailure {
    pub key: String,
    pub kind: FailureKind,
    pub message: String,
}

impl CallbackFailure {
    pub(crate) fn failed(key: &str, err: &anyhow::Error) -> Self {
        Self {
            key: key.to_string(),
            kind: FailureKind::Failed,
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn panicked(key: &str, payload: &(dyn Any + Send)) -> Self {
        Self {
            key: key.to_string(),
            kind: FailureKind::Panicked,
            message: panic_message(payload),
        }
    }
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Failed => {
                write!(f, "refresh callback `{}` failed: {}", self.key, self.message)
            }
            FailureKind::Panicked => {
                write!(f, "refresh callback `{}` panicked: {}", self.key, self.message)
            }
        }
    }
}

impl std::error::Error for CallbackFailure {}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Generation after the sweep's bump.
    pub generation: u64,
    /// Number of callbacks in the sweep snapshot.
    pub invoked: usize,
    pub failures: Vec<CallbackFailure>,
}

impl SweepReport {
    pub fn succeeded(&self) -> usize {
        self.invoked.saturating_sub(self.failures.len())
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, key: &str) -> Option<&CallbackFailure> {
        self.failures.iter().find(|f| f.key == key)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_outcome_resolves_immediately() {
        let outcome = MaybeAsync::done();
        assert!(outcome.is_ready());
        assert!(outcome.into_future().await.is_ok());
    }

    #[tokio::test]
    async fn test_pending_outcome_carries_error() {
        let outcome = MaybeAsync::pending(async { Err::<(), _>(anyhow::anyhow!("network down")) });
        assert!(!outcome.is_ready());
        let err = outcome.into_future().await.unwrap_err();
        assert_eq!(err.to_string(), "network down");
    }

    #[test]
    fn test_failure_display_names_key() {
        let err = anyhow::anyhow!("timeout").context("fetch events");
        let failure = CallbackFailure::failed("events-5", &err);
        assert_eq!(failure.kind, FailureKind::Failed);
        assert_eq!(
            failure.to_string(),
            "refresh callback `events-5` failed: fetch events: timeout"
        );
    }

    #[test]
    fn test_panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(CallbackFailure::panicked("a", payload.as_ref()).message, "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(CallbackFailure::panicked("a", payload.as_ref()).message, "owned boom");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(
            CallbackFailure::panicked("a", payload.as_ref()).message,
            "non-string panic payload"
        );
    }

    #[test]
    fn test_report_counts() {
        let report = SweepReport {
            generation: 3,
            invoked: 4,
            failures: vec![CallbackFailure {
                key: "achievements-5".to_string(),
                kind: FailureKind::Panicked,
                message: "boom".to_string(),
            }],
        };
        assert_eq!(report.succeeded(), 3);
        assert!(!report.is_clean());
        assert!(report.failure("achievements-5").is_some());
        assert!(report.failure("events-5").is_none());
    }
}
