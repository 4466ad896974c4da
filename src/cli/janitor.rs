//! Janitor command: periodic expiry sweeps in the foreground

use std::time::Duration;

use colored::Colorize;

use crate::cli::cache::print_cleanup;
use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::output::json::format_json;

/// Sweep immediately, then every interval, until Ctrl-C
pub async fn run(ctx: &CommandContext, interval_secs: Option<u64>) -> Result<()> {
    let period = interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| ctx.config.cleanup_interval());

    if ctx.format != OutputFormat::Json {
        println!(
            "{} every {}s (Ctrl-C to stop)",
            "Janitor running".bold(),
            period.as_secs()
        );
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let format = ctx.format;
    let sweeps = ctx
        .manager()
        .run_janitor(period, shutdown, |report| match format {
            OutputFormat::Json => match format_json(report) {
                Ok(json) => println!("{}", json),
                Err(e) => log::warn!("Failed to encode sweep report: {}", e),
            },
            _ => print_cleanup(report),
        })
        .await;

    if format != OutputFormat::Json {
        println!("Stopped after {} sweeps", sweeps);
    }
    Ok(())
}
