//! Configuration management for FunRaise.
//!
//! Loads configuration from ${FUNRAISE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::refresh::FocusPolicy;

pub mod paths {
    //! Path resolution for FunRaise configuration and data directories.
    //!
    //! FUNRAISE_HOME resolution order:
    //! 1. FUNRAISE_HOME environment variable (if set)
    //! 2. ~/.config/funraise (default)

    use std::path::PathBuf;

    /// Returns the FunRaise home directory.
    ///
    /// Checks FUNRAISE_HOME env var first, falls back to ~/.config/funraise,
    /// then to a relative `.funraise` directory when no home is known.
    pub fn funraise_home() -> PathBuf {
        if let Ok(home) = std::env::var("FUNRAISE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".funraise"),
            |h| h.join(".config").join("funraise"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        funraise_home().join("config.toml")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        funraise_home().join("logs")
    }
}

/// Refresh coordination settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// What a screen does when it regains navigation focus.
    pub on_focus: FocusPolicy,
}

/// Search input settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke, in milliseconds.
    pub debounce_ms: u64,
    /// Minimum trimmed query length, in characters.
    pub min_query_len: usize,
}

impl SearchConfig {
    const DEFAULT_DEBOUNCE_MS: u64 = 300;
    const DEFAULT_MIN_QUERY_LEN: usize = 1;

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: Self::DEFAULT_DEBOUNCE_MS,
            min_query_len: Self::DEFAULT_MIN_QUERY_LEN,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// tracing `EnvFilter` directive (RUST_LOG overrides it)
    pub level: String,
    /// Also write to ${FUNRAISE_HOME}/logs/funraise.log
    pub file: bool,
}

impl LogConfig {
    const DEFAULT_LEVEL: &str = "info";
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Self::DEFAULT_LEVEL.to_string(),
            file: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub refresh: RefreshConfig,
    pub search: SearchConfig,
    pub log: LogConfig,
}

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Renders the commented template with `values` laid over it.
///
/// Keys present in `values` replace the template's; everything else,
/// comments included, comes from the template. `what` names the overlay in
/// parse errors.
fn overlay_template(values: &str, what: &str) -> Result<toml_edit::DocumentMut> {
    let mut doc: toml_edit::DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let overlay: toml_edit::DocumentMut = values
        .parse()
        .with_context(|| format!("Failed to parse {what}"))?;

    overlay_table(doc.as_table_mut(), overlay.as_table());
    Ok(doc)
}

/// Copies `source` into `target`, descending into tables present in both so
/// sibling keys (and their comments) in `target` survive.
fn overlay_table(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, item) in source {
        match (item, target.get_mut(key)) {
            (Item::None, _) => {}
            (Item::Table(section), Some(Item::Table(existing))) => {
                overlay_table(existing, section);
            }
            // Keep the template's decor (comments) on plain values.
            (Item::Value(value), Some(Item::Value(existing))) => {
                let decor = existing.decor().clone();
                *existing = value.clone();
                *existing.decor_mut() = decor;
            }
            (item, _) => {
                target[key] = item.clone();
            }
        }
    }
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Used by `xtask update-default-config` to keep `default_config.toml`
    /// in sync with the defaults above. Comments come from the embedded
    /// template; values come from `Config::default()`.
    pub fn generate() -> Result<String> {
        let defaults = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;
        Ok(overlay_template(&defaults, "generated config")?.to_string())
    }

    /// Saves only the refresh.on_focus field to the config file.
    pub fn save_focus_policy(policy: FocusPolicy) -> Result<()> {
        Self::save_focus_policy_to(&paths::config_path(), policy)
    }

    /// Saves only the refresh.on_focus field to a specific config file path.
    ///
    /// Creates the file from the template if it doesn't exist; otherwise the
    /// user's values are merged into the latest template first.
    pub fn save_focus_policy_to(path: &Path, policy: FocusPolicy) -> Result<()> {
        let user_config = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            String::new()
        };

        let mut doc = overlay_template(&user_config, &format!("config {}", path.display()))?;
        doc["refresh"]["on_focus"] = toml_edit::value(policy.display_name());

        Self::write_config(path, &doc.to_string())?;
        tracing::debug!(path = %path.display(), policy = %policy, "saved focus policy");
        Ok(())
    }

    /// Writes `content` to `path` through a sibling temp file, so readers
    /// never see a half-written config.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        }

        let staged = path.with_extension("toml.tmp");
        fs::write(&staged, content)
            .with_context(|| format!("Failed to stage config at {}", staged.display()))?;
        fs::rename(&staged, path)
            .with_context(|| format!("Failed to move config into place at {}", path.display()))?;

        tracing::debug!(path = %path.display(), "config written");
        Ok(())
    }
}
