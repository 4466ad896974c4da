//! CLI command definitions and handlers

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod cache;
pub mod classify;
pub mod completions;
pub mod context;
pub mod fetch;
pub mod image;
pub mod init;
pub mod janitor;
pub mod status;

pub use args::OutputFormat;
pub use context::CommandContext;

/// foliocache - offline-first asset cache for a portfolio site
#[derive(Parser, Debug)]
#[command(name = "foliocache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "FOLIOCACHE_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "FOLIOCACHE_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override cache directory
    #[arg(long, global = true, env = "FOLIOCACHE_CACHE_DIR", hide_env = true)]
    pub cache_dir: Option<String>,

    /// Site origin relative URLs resolve against
    #[arg(long, global = true, env = "FOLIOCACHE_ORIGIN", hide_env = true)]
    pub origin: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "FOLIOCACHE_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize foliocache configuration (prompts for the origin unless --origin is given)
    Init,

    /// Show configuration and cache status
    Status,

    /// Display version information
    Version,

    /// Show how URLs are classified and cached
    #[command(after_help = "EXAMPLES:\n  \
        foliocache classify /app.js /images/me.jpg\n  \
        foliocache classify 'https://fonts.googleapis.com/css2?family=Inter'")]
    Classify {
        /// URLs to classify (relative or absolute)
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Fetch a URL through its caching strategy
    Fetch {
        /// URL to fetch (relative URLs need an origin)
        url: String,

        /// HTTP method
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,

        /// Write the body to FILE ("-" for stdout, body only)
        #[arg(long, short = 'o', value_name = "FILE")]
        out: Option<String>,
    },

    /// Manage the local cache store
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Run the periodic expiry sweep until interrupted
    Janitor {
        /// Seconds between sweeps (defaults to config, 3600)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: Option<u64>,
    },

    /// Negotiate a modern image format and build a srcset
    Image {
        /// Image URL (relative or absolute)
        url: String,

        /// Client Accept header to negotiate against
        #[arg(long)]
        accept: Option<String>,

        /// Treat the image as lazy (rewrite data-src instead of src)
        #[arg(long)]
        lazy: bool,
    },

    /// Generate shell completions
    #[command(after_help = "\
Install:
  bash:   foliocache completion bash > /etc/bash_completion.d/foliocache
  zsh:    foliocache completion zsh > \"${fpath[1]}/_foliocache\"
  fish:   foliocache completion fish > ~/.config/fish/completions/foliocache.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show per-cache statistics
    Status,
    /// Delete every cache in the namespace
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Remove expired entries and orphaned caches once
    Cleanup,
    /// Fetch the critical URLs into the static cache
    Preload,
    /// Print cache directory path
    Path,
}
