//! Search command handler.
//!
//! Replays search box edits from stdin through a debounced [`SearchInput`]
//! and prints each query that would reach the backend.

use std::time::Duration;

use anyhow::{Context, Result};
use funraise_core::SearchInput;
use funraise_core::config::SearchConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One line of input.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    /// `+N`: the user stops typing for N milliseconds.
    Pause(Duration),
    Text(&'a str),
}

fn parse_line(line: &str) -> Line<'_> {
    line.strip_prefix('+')
        .and_then(|ms| ms.trim().parse::<u64>().ok())
        .map_or(Line::Text(line), |ms| Line::Pause(Duration::from_millis(ms)))
}

pub async fn run(config: &SearchConfig) -> Result<()> {
    let search = SearchInput::new(config, |query| println!("query: {query}"));
    tracing::debug!(
        debounce_ms = config.debounce_ms,
        min_query_len = config.min_query_len,
        "search input ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        match parse_line(&line) {
            Line::Pause(pause) => tokio::time::sleep(pause).await,
            Line::Text(text) => search.input(text),
        }
    }

    // Let the trailing edit settle before exiting.
    let step = search.delay().max(Duration::from_millis(1));
    while search.is_pending() {
        tokio::time::sleep(step).await;
    }
    Ok(())
}
