//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use funraise_core::config::{self, Config, LogConfig};
use funraise_core::{FocusPolicy, logging};

mod commands;

#[derive(Parser)]
#[command(name = "funraise")]
#[command(version)]
#[command(about = "Exercise the FunRaise pull-to-refresh and search core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of $FUNRAISE_HOME/config.toml
    #[arg(long, global = true, env = "FUNRAISE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Register simulated consumers and run one refresh sweep
    Refresh {
        /// Consumer to register, as KEY or KEY:DELAY_MS (repeatable)
        #[arg(long = "consumer", value_name = "KEY[:DELAY_MS]", required = true)]
        consumers: Vec<commands::refresh::ConsumerSpec>,

        /// Make this consumer's refresh fail (repeatable)
        #[arg(long, value_name = "KEY")]
        fail: Vec<String>,

        /// Make this consumer's refresh panic (repeatable)
        #[arg(long, value_name = "KEY")]
        panic: Vec<String>,

        /// Simulate a navigation focus event with this policy instead of a
        /// pull gesture (sweep, rekey, ignore; "config" uses refresh.on_focus)
        #[arg(long, value_name = "POLICY")]
        focus: Option<String>,

        /// Print the sweep report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Debounce search keystrokes read from stdin
    ///
    /// Each line is the current search box text. A line `+N` pauses for N
    /// milliseconds.
    Search {
        /// Override search.debounce_ms
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,

        /// Override search.min_query_len
        #[arg(long, value_name = "N")]
        min_len: Option<usize>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
    /// Persist refresh.on_focus
    SetFocus {
        /// sweep, rekey or ignore
        #[arg(value_name = "POLICY")]
        policy: FocusPolicy,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::paths::config_path);

    match cli.command {
        // Config commands must work even when the current file is broken,
        // so they log with default settings.
        Commands::Config { command } => {
            let _log_guard = logging::init(&LogConfig::default(), cli.verbose)?;
            match command {
                ConfigCommands::Path => {
                    commands::config::path(&config_path);
                    Ok(())
                }
                ConfigCommands::Init => commands::config::init(&config_path),
                ConfigCommands::Generate => commands::config::generate(),
                ConfigCommands::SetFocus { policy } => {
                    commands::config::set_focus(&config_path, policy)
                }
            }
        }

        Commands::Refresh {
            consumers,
            fail,
            panic,
            focus,
            json,
        } => {
            let config = Config::load_from(&config_path)?;
            let _log_guard = logging::init(&config.log, cli.verbose)?;
            let focus = focus
                .map(|raw| commands::refresh::resolve_focus(&raw, &config))
                .transpose()?;
            let options = commands::refresh::RefreshOptions {
                consumers,
                fail,
                panic,
                focus,
                json,
            };
            runtime()?.block_on(commands::refresh::run(options))
        }

        Commands::Search { delay_ms, min_len } => {
            let config = Config::load_from(&config_path)?;
            let _log_guard = logging::init(&config.log, cli.verbose)?;
            let mut search = config.search;
            if let Some(ms) = delay_ms {
                search.debounce_ms = ms;
            }
            if let Some(n) = min_len {
                search.min_query_len = n;
            }
            runtime()?.block_on(commands::search::run(&search))
        }
    }
}

/// Single-threaded, like the UI event loop the core is built for.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")
}
