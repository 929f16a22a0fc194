//! Config command handlers.

use std::path::Path;

use anyhow::{Context, Result};
use funraise_core::FocusPolicy;
use funraise_core::config::Config;

pub fn path(config_path: &Path) {
    println!("{}", config_path.display());
}

pub fn init(config_path: &Path) -> Result<()> {
    Config::init(config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn generate() -> Result<()> {
    let toml = Config::generate()?;
    print!("{toml}");
    Ok(())
}

pub fn set_focus(config_path: &Path, policy: FocusPolicy) -> Result<()> {
    Config::save_focus_policy_to(config_path, policy)
        .with_context(|| format!("update config at {}", config_path.display()))?;
    println!("Set refresh.on_focus = \"{policy}\" in {}", config_path.display());
    Ok(())
}
