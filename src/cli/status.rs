//! Status command implementation

use colored::Colorize;

use crate::cli::args::GlobalOptions;
use crate::cli::context::cache_dir;
use crate::config::Config;
use crate::error::Result;

/// Display configuration and cache location status
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}\n", "foliocache Status".bold());

    let config_path = Config::resolve_path(opts.config_ref())?;
    let exists = config_path.exists();

    match Config::load_at(opts.config_ref()) {
        Ok(config) => {
            if exists {
                println!("Config file: {}", config_path.display().to_string().cyan());
            } else {
                println!(
                    "Config file: {} {}",
                    config_path.display().to_string().cyan(),
                    "(not found, using defaults)".dimmed()
                );
            }
            println!();

            match opts.origin_ref().or(config.origin.as_deref()) {
                Some(origin) => println!("{} Origin: {}", "✓".green(), origin),
                None => {
                    println!("{} Origin not configured", "✗".red());
                    println!("  → Run 'foliocache init' to configure");
                }
            }

            println!(
                "{} Cache namespace: {}-*-{}",
                "✓".green(),
                config.cache_prefix,
                config.cache_version
            );
            println!(
                "{} Critical URLs: {}",
                "○".dimmed(),
                config.critical_urls.len()
            );
            println!(
                "{} Janitor interval: {}s",
                "○".dimmed(),
                config.cleanup_interval_secs
            );
            match config.request_timeout_secs {
                Some(secs) => println!("{} Request timeout: {}s", "○".dimmed(), secs),
                None => println!("{} Request timeout: none", "○".dimmed()),
            }

            let dir = cache_dir(opts.cache_dir_ref())?;
            let db = dir.join("cache.db");
            if db.exists() {
                println!("{} Cache store: {}", "✓".green(), dir.display());
            } else {
                println!(
                    "{} Cache store: {} {}",
                    "○".dimmed(),
                    dir.display(),
                    "(not created yet)".dimmed()
                );
            }
            println!();
        }
        Err(e) => {
            println!("{} Configuration invalid: {}", "✗".red(), e);
            println!();
            println!("Fix {} or run {}.", config_path.display(), "foliocache init".cyan());
            println!();
        }
    }

    Ok(())
}
