//! Init command implementation

use colored::Colorize;
use dialoguer::{Input, theme::ColorfulTheme};
use url::Url;

use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::{ConfigError, Result};

/// Create or update the config file with the site origin
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}", "Welcome to foliocache!".bold().green());

    let origin = match opts.origin_ref() {
        Some(origin) => origin.to_string(),
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Site origin (e.g. https://example.com)")
            .validate_with(|input: &String| -> std::result::Result<(), String> {
                Url::parse(input).map(|_| ()).map_err(|e| e.to_string())
            })
            .interact_text()?,
    };

    let url = Url::parse(&origin)
        .map_err(|e| ConfigError::Invalid(format!("origin '{}': {}", origin, e)))?;

    let mut config = Config::load_at(opts.config_ref()).unwrap_or_else(|e| {
        log::warn!("Existing config unreadable, starting fresh: {}", e);
        Config::default()
    });
    config.origin = Some(url.to_string());

    let path = config.save_at(opts.config_ref())?;

    println!(
        "\n{} Configuration saved to: {}",
        "✓".green(),
        path.display()
    );
    println!("  Origin: {}", url.as_str().bold());
    println!("  Caches: {}-*-{}", config.cache_prefix, config.cache_version);

    println!("\n{}", "You're all set! Try running:".bold());
    println!("  {} - Prewarm critical pages", "foliocache cache preload".cyan());
    println!("  {} - Fetch through the cache", "foliocache fetch /".cyan());

    Ok(())
}
