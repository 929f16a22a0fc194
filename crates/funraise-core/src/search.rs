//! Debounced search input.
//!
//! Keystrokes go through a [`Debounced`] wrapper; once the user pauses, the
//! trimmed text is issued to the query sink. Queries shorter than the
//! configured minimum, or equal to the last issued query, are skipped.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::SearchConfig;
use crate::debounce::Debounced;

#[derive(Debug, Clone)]
pub struct SearchInput {
    debounced: Debounced<String>,
}

impl SearchInput {
    /// Builds a search input from config.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn new<F>(config: &SearchConfig, sink: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self::with_options(config.debounce(), config.min_query_len, sink)
    }

    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn with_options<F>(delay: Duration, min_query_len: usize, sink: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let last_issued: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let debounced = Debounced::new(delay, move |text: String| {
            let query = text.trim();
            let mut last = last_issued.lock().unwrap_or_else(PoisonError::into_inner);

            if query.chars().count() < min_query_len {
                tracing::trace!(query, "search query below minimum length");
                // Forget the last query so retyping it issues again.
                *last = None;
                return;
            }
            if last.as_deref() == Some(query) {
                tracing::trace!(query, "search query unchanged");
                return;
            }

            *last = Some(query.to_string());
            drop(last);
            tracing::debug!(query, "issuing search query");
            sink(query.to_string());
        });
        Self { debounced }
    }

    /// Feeds the current contents of the search box.
    pub fn input(&self, text: impl Into<String>) {
        self.debounced.call(text.into());
    }

    /// Drops pending input, e.g. when the search screen closes.
    pub fn cancel(&self) -> bool {
        self.debounced.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.debounced.is_pending()
    }

    pub fn delay(&self) -> Duration {
        self.debounced.delay()
    }
}
