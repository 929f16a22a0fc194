use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use funraise_core::{FocusPolicy, MaybeAsync, RefreshBinding, RefreshRegistry, SearchInput};

/// A list view that re-fetches its page on refresh.
struct ListView {
    binding: RefreshBinding<u32>,
    fetches: Arc<AtomicUsize>,
    fail: bool,
}

impl ListView {
    fn new(registry: &RefreshRegistry, fail: bool) -> Self {
        Self {
            binding: RefreshBinding::new(registry.clone()),
            fetches: Arc::new(AtomicUsize::new(0)),
            fail,
        }
    }

    fn render(&mut self, key: &str, page: u32) -> u64 {
        let fetches = Arc::clone(&self.fetches);
        let fail = self.fail;
        self.binding
            .bind(
                key,
                move || {
                    let fetches = Arc::clone(&fetches);
                    MaybeAsync::pending(async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        fetches.fetch_add(1, Ordering::SeqCst);
                        if fail {
                            anyhow::bail!("page {page} unavailable");
                        }
                        Ok(())
                    })
                },
                &[page],
            )
            .generation
    }
}

#[tokio::test(start_paused = true)]
async fn test_pull_to_refresh_across_mounted_views() {
    let registry = RefreshRegistry::new();
    let mut events = ListView::new(&registry, false);
    let mut achievements = ListView::new(&registry, true);

    assert_eq!(events.render("events-5", 1), 0);
    assert_eq!(achievements.render("achievements-5", 1), 0);

    let mut spinner = registry.subscribe_refreshing();
    let report = registry.run_refresh().await;

    assert_eq!(report.invoked, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "achievements-5");
    assert!(report.failures[0].message.contains("page 1 unavailable"));
    assert_eq!(events.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(achievements.fetches.load(Ordering::SeqCst), 1);
    assert!(spinner.has_changed().unwrap());
    assert!(!*spinner.borrow_and_update());

    // Re-render picks up the new generation for list keys.
    assert_eq!(events.render("events-5", 1), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unmounted_view_leaves_the_sweep() {
    let registry = RefreshRegistry::new();
    let mut events = ListView::new(&registry, false);
    events.render("events-5", 1);
    {
        let mut other = ListView::new(&registry, false);
        other.render("events-6", 1);
        assert_eq!(registry.len(), 2);
    }

    let report = registry.run_refresh().await;

    assert_eq!(report.invoked, 1);
    assert_eq!(registry.keys(), vec!["events-5".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_navigating_to_another_event_moves_the_registration() {
    let registry = RefreshRegistry::new();
    let mut view = ListView::new(&registry, false);

    view.render("event-detail-5", 1);
    view.render("event-detail-9", 1);
    view.render("event-detail-9", 2);

    assert_eq!(registry.keys(), vec!["event-detail-9".to_string()]);
    registry.run_refresh().await;
    assert_eq!(view.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_focus_rekeys_without_fetching() {
    let registry = RefreshRegistry::new();
    let mut view = ListView::new(&registry, false);
    view.render("events-5", 1);
    let mut generation = registry.subscribe_generation();

    registry.on_focus(FocusPolicy::Rekey).await;

    assert_eq!(view.fetches.load(Ordering::SeqCst), 0);
    generation.changed().await.unwrap();
    assert_eq!(*generation.borrow(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_search_feeds_refreshable_results() {
    let registry = RefreshRegistry::new();
    let last_query = Arc::new(Mutex::new(String::new()));
    let searches = Arc::new(AtomicU32::new(0));

    let search = SearchInput::with_options(Duration::from_millis(300), 2, {
        let last_query = Arc::clone(&last_query);
        let searches = Arc::clone(&searches);
        move |query| {
            searches.fetch_add(1, Ordering::SeqCst);
            *last_query.lock().unwrap() = query;
        }
    });

    let mut results = RefreshBinding::<String>::new(registry.clone());
    for text in ["s", "sa", "sav", "save"] {
        search.input(text);
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    let query = last_query.lock().unwrap().clone();
    assert_eq!(query, "save");
    assert_eq!(searches.load(Ordering::SeqCst), 1);

    results.bind("search-results", MaybeAsync::done, &[query]);
    let report = registry.run_refresh().await;
    assert_eq!(report.invoked, 1);
    assert!(report.is_clean());
}
