//! Cache management commands

use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;

use crate::cache::manager::{CacheStats, CleanupReport};
use crate::cli::args::GlobalOptions;
use crate::cli::context::cache_dir;
use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::output::formatters::format_size;
use crate::output::{print_json, print_rows};

#[derive(Debug, Serialize, Tabled)]
struct CacheRow {
    #[tabled(rename = "CACHE")]
    name: String,
    #[tabled(rename = "ENTRIES")]
    entries: usize,
    #[tabled(rename = "SIZE")]
    size: String,
}

impl From<&CacheStats> for CacheRow {
    fn from(stats: &CacheStats) -> Self {
        Self {
            name: stats.name.clone(),
            entries: stats.entries,
            size: format_size(stats.total_bytes),
        }
    }
}

/// Show per-cache statistics
pub fn status(ctx: &CommandContext, opts: &GlobalOptions) -> Result<()> {
    let stats = ctx.manager().get_stats()?;

    match ctx.format {
        OutputFormat::Json => print_json(&stats),
        OutputFormat::Table => {
            let rows: Vec<CacheRow> = stats.iter().map(CacheRow::from).collect();
            print_rows(&rows, OutputFormat::Table)
        }
        OutputFormat::Pretty => {
            let path = cache_dir(opts.cache_dir_ref())?;
            let entries: usize = stats.iter().map(|s| s.entries).sum();
            let bytes: usize = stats.iter().map(|s| s.total_bytes).sum();

            println!("Cache Status");
            println!("────────────────────────────────────────");
            println!("Location:       {}", path.display());
            println!("Version:        {}", ctx.config.cache_version);
            println!("Caches:         {}", stats.len());
            println!("Entries:        {}", entries);
            println!("Total size:     {}", format_size(bytes));

            for cache in &stats {
                let orphan = if ctx.strategy.namespace().is_orphan(&cache.name) {
                    " (orphaned)".yellow().to_string()
                } else {
                    String::new()
                };
                println!();
                println!(
                    "{}{}  {} entries, {}",
                    cache.name.bold(),
                    orphan,
                    cache.entries,
                    format_size(cache.total_bytes)
                );
                for url in &cache.urls {
                    println!("  {}", url.dimmed());
                }
            }
            Ok(())
        }
    }
}

/// Delete every namespaced cache
pub fn clear(ctx: &CommandContext, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete all '{}' caches?",
                ctx.config.cache_prefix
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    ctx.check_rate_limit("cache-clear")?;
    let report = ctx.manager().clear_all();

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        _ => {
            if report.caches_removed > 0 {
                println!(
                    "Cleared {} caches ({} entries)",
                    report.caches_removed, report.entries_removed
                );
            } else {
                println!("Cache was already empty");
            }
            print_failures(&report.failures);
        }
    }

    Ok(())
}

/// Run one expiry sweep
pub fn cleanup(ctx: &CommandContext) -> Result<()> {
    let report = ctx.manager().cleanup_expired_caches();

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        _ => print_cleanup(&report),
    }
    Ok(())
}

pub(crate) fn print_cleanup(report: &CleanupReport) {
    println!(
        "Scanned {} caches: {} expired entries removed, {} orphaned caches removed",
        report.caches_scanned, report.entries_removed, report.orphaned_caches_removed
    );
    print_failures(&report.failures);
}

/// Prewarm the static cache with the configured critical URLs
pub async fn preload(ctx: &CommandContext) -> Result<()> {
    let manager = ctx.preload_manager()?;
    ctx.check_rate_limit("preload")?;

    let progress = match ctx.format {
        OutputFormat::Json => ProgressBar::hidden(),
        _ => {
            let pb = ProgressBar::new(manager.critical_urls().len() as u64);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            pb.set_message("preloading");
            pb
        }
    };

    let report = manager.preload_critical(Some(&progress)).await;
    progress.finish_and_clear();

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        _ => {
            for url in &report.stored {
                println!("{} {}", "✓".green(), url);
            }
            for failure in &report.failed {
                println!("{} {} ({})", "✗".red(), failure.url, failure.error.dimmed());
            }
            println!(
                "\nPreloaded {} of {} critical URLs",
                report.stored.len(),
                report.stored.len() + report.failed.len()
            );
        }
    }
    Ok(())
}

/// Print the cache directory path
pub fn path(opts: &GlobalOptions) -> Result<()> {
    println!("{}", cache_dir(opts.cache_dir_ref())?.display());
    Ok(())
}

fn print_failures(failures: &[String]) {
    for failure in failures {
        eprintln!("{} {}", "⚠".yellow(), failure);
    }
}
