//! Refresh command handler.
//!
//! Mounts simulated consumers on a fresh registry and drives one pull
//! gesture (or focus event) through it.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use funraise_core::config::Config;
use funraise_core::refresh::FailureKind;
use funraise_core::{FocusPolicy, MaybeAsync, RefreshRegistry, SweepReport, callback};

/// A consumer given on the command line as `KEY` or `KEY:DELAY_MS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSpec {
    pub key: String,
    pub delay: Duration,
}

impl FromStr for ConsumerSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (key, delay) = match s.split_once(':') {
            Some((key, ms)) => {
                let ms: u64 = ms
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid delay '{ms}' for consumer '{key}'"))?;
                (key, Duration::from_millis(ms))
            }
            None => (s, Duration::ZERO),
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("consumer key must not be empty");
        }
        Ok(Self {
            key: key.to_string(),
            delay,
        })
    }
}

#[derive(Debug)]
pub struct RefreshOptions {
    pub consumers: Vec<ConsumerSpec>,
    pub fail: Vec<String>,
    pub panic: Vec<String>,
    pub focus: Option<FocusPolicy>,
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Parses a `--focus` value; `config` means the configured `refresh.on_focus`.
pub fn resolve_focus(raw: &str, config: &Config) -> Result<FocusPolicy> {
    if raw.trim().eq_ignore_ascii_case("config") {
        return Ok(config.refresh.on_focus);
    }
    raw.parse()
}

pub async fn run(options: RefreshOptions) -> Result<()> {
    let known: HashSet<&str> = options.consumers.iter().map(|c| c.key.as_str()).collect();
    for (flag, keys) in [("--fail", &options.fail), ("--panic", &options.panic)] {
        if let Some(unknown) = keys.iter().find(|k| !known.contains(k.as_str())) {
            bail!("{flag} names unknown consumer '{unknown}'");
        }
    }

    let registry = RefreshRegistry::new();
    for consumer in &options.consumers {
        let behavior = if options.panic.contains(&consumer.key) {
            Behavior::Panic
        } else if options.fail.contains(&consumer.key) {
            Behavior::Fail
        } else {
            Behavior::Succeed
        };
        mount(&registry, consumer, behavior);
    }

    match options.focus {
        Some(policy) if policy != FocusPolicy::Sweep => {
            let generation = registry.on_focus(policy).await;
            if options.json {
                let value = serde_json::json!({
                    "focus": policy.display_name(),
                    "generation": generation,
                    "invoked": 0,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("focus ({policy}): generation {generation}, no consumers refreshed");
            }
        }
        _ => {
            let report = registry.run_refresh().await;
            if options.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, &options.consumers);
            }
        }
    }

    Ok(())
}

/// Registers a consumer whose refresh settles after its delay.
///
/// Zero-delay consumers settle synchronously.
fn mount(registry: &RefreshRegistry, consumer: &ConsumerSpec, behavior: Behavior) {
    let key = consumer.key.clone();
    let delay = consumer.delay;

    registry.register(
        consumer.key.clone(),
        callback(move || {
            if delay.is_zero() {
                return match behavior {
                    Behavior::Succeed => MaybeAsync::done(),
                    Behavior::Fail => MaybeAsync::failed(anyhow::anyhow!("{key} unavailable")),
                    Behavior::Panic => panic!("{key} crashed"),
                };
            }
            let key = key.clone();
            MaybeAsync::pending(async move {
                tokio::time::sleep(delay).await;
                match behavior {
                    Behavior::Succeed => Ok(()),
                    Behavior::Fail => bail!("{key} unavailable"),
                    Behavior::Panic => panic!("{key} crashed"),
                }
            })
        }),
    );
}

fn print_report(report: &SweepReport, consumers: &[ConsumerSpec]) {
    println!(
        "refreshed {} consumers (generation {})",
        report.invoked, report.generation
    );

    let mut seen = HashSet::new();
    let width = consumers.iter().map(|c| c.key.len()).max().unwrap_or(0);
    for consumer in consumers {
        if !seen.insert(consumer.key.as_str()) {
            continue;
        }
        let status = match report.failure(&consumer.key) {
            None => "ok".to_string(),
            Some(failure) => match failure.kind {
                FailureKind::Failed => format!("failed: {}", failure.message),
                FailureKind::Panicked => format!("panicked: {}", failure.message),
            },
        };
        println!("  {:<width$}  {status}", consumer.key);
    }
}
