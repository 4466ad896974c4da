//! Global CLI options shared across all commands
//!
//! Collects the global flags once so handlers take a single argument instead
//! of a growing parameter list.

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to command handlers.
///
/// # Precedence
///
/// CLI flag > environment variable > config file > default. This struct
/// captures the CLI/env layer; config file values are merged in
/// `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format (pretty, table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.foliocache/config.yaml)
    pub config: Option<String>,

    /// Cache directory override (defaults to the platform cache dir)
    pub cache_dir: Option<String>,

    /// Site origin override
    pub origin: Option<String>,
}

impl GlobalOptions {
    /// Build from parsed CLI flags; called once in main.rs
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            cache_dir: cli.cache_dir.clone(),
            origin: cli.origin.clone(),
        }
    }

    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn cache_dir_ref(&self) -> Option<&str> {
        self.cache_dir.as_deref()
    }

    pub fn origin_ref(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}
