//! Fetch command: serve one request through its caching strategy

use std::io::Write;

use colored::Colorize;
use reqwest::Method;
use serde::Serialize;

use crate::cache::freshness::{cached_at, now_millis};
use crate::cache::matcher::AssetClass;
use crate::cache::strategy::{Degradation, ServedFrom, Strategy, StrategyOutcome, is_cacheable};
use crate::cache::StrategyDescriptor;
use crate::cli::{CommandContext, OutputFormat};
use crate::client::Request;
use crate::error::{Error, Result};
use crate::output::formatters::{format_age, format_size, format_timestamp_ms, format_ttl};
use crate::output::print_json;
use crate::output::table::format_fields;

/// Outcome of a fetch, as reported to the operator
#[derive(Debug, Serialize)]
pub struct FetchReport {
    pub url: String,
    pub method: String,
    pub class: AssetClass,
    pub strategy: Strategy,
    pub cache_name: String,
    pub ttl_secs: Option<u64>,
    pub status: u16,
    pub status_text: String,
    pub served_from: ServedFrom,
    pub content_type: Option<String>,
    pub size_bytes: usize,
    /// Write time of the served copy, when it came from the cache
    pub cached_at: Option<i64>,
    pub degradations: Vec<Degradation>,
    /// False when the method kept the request off the cache entirely
    pub cacheable: bool,
    /// Background refresh result; `None` when no refresh was pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revalidation_error: Option<String>,
    pub revalidated: bool,
}

impl FetchReport {
    fn new(
        request: &Request,
        descriptor: &StrategyDescriptor,
        outcome: &StrategyOutcome,
        revalidation: Option<std::result::Result<(), String>>,
    ) -> Self {
        let response = &outcome.response;
        Self {
            url: request.url.to_string(),
            method: request.method.to_string(),
            class: descriptor.class,
            strategy: descriptor.strategy,
            cache_name: descriptor.cache_name.clone(),
            ttl_secs: descriptor.ttl.map(|t| t.as_secs()),
            status: response.status,
            status_text: response.status_text.clone(),
            served_from: outcome.served_from,
            content_type: response.content_type().map(str::to_string),
            size_bytes: response.body.len(),
            cached_at: match outcome.served_from {
                ServedFrom::Cache => cached_at(response),
                _ => None,
            },
            degradations: outcome.degradations.clone(),
            cacheable: is_cacheable(request),
            revalidated: matches!(revalidation, Some(Ok(()))),
            revalidation_error: revalidation.and_then(|r| r.err()),
        }
    }
}

pub async fn run(ctx: &CommandContext, url: &str, method: &str, out: Option<&str>) -> Result<()> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|e| Error::Other(format!("Invalid method '{}': {}", method, e)))?;
    let request = ctx.request(method, url)?;
    let descriptor = ctx.strategy.get_cache_strategy(&request);

    let mut outcome = ctx.strategy.handle(&request).await?;

    // The process is about to exit; let a background refresh land first
    let revalidation = outcome
        .wait_for_revalidation()
        .await
        .map(|r| r.map_err(|e| e.to_string()));
    if let Some(Err(e)) = &revalidation {
        log::warn!("Background refresh of {} failed: {}", request.url, e);
    }

    if out == Some("-") {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&outcome.response.body)?;
        stdout.flush()?;
        return Ok(());
    }
    if let Some(path) = out {
        std::fs::write(path, &outcome.response.body)?;
    }

    let report = FetchReport::new(&request, &descriptor, &outcome, revalidation);
    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => println!("{}", format_fields(&report_fields(&report))),
        OutputFormat::Pretty => print_pretty(&report, out),
    }

    Ok(())
}

fn report_fields(report: &FetchReport) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("URL", report.url.clone()),
        ("Method", report.method.clone()),
        ("Status", format!("{} {}", report.status, report.status_text)),
        ("Source", report.served_from.to_string()),
        ("Cacheable", report.cacheable.to_string()),
        ("Class", report.class.to_string()),
        ("Strategy", report.strategy.to_string()),
        ("Cache", report.cache_name.clone()),
        (
            "TTL",
            format_ttl(report.ttl_secs.map(std::time::Duration::from_secs)),
        ),
        ("Size", format_size(report.size_bytes)),
    ];
    if let Some(ts) = report.cached_at {
        fields.push(("Cached at", format_timestamp_ms(ts)));
    }
    for degradation in &report.degradations {
        fields.push(("Degraded", degradation.to_string()));
    }
    fields
}

fn print_pretty(report: &FetchReport, out: Option<&str>) {
    let status = format!("{} {}", report.status, report.status_text);
    let status = if (200..300).contains(&report.status) {
        status.green()
    } else {
        status.red()
    };
    let source = match report.served_from {
        ServedFrom::Cache => "cache".cyan(),
        ServedFrom::Network => "network".green(),
        ServedFrom::Offline => "offline".red(),
    };

    println!("{} {}", report.method.bold(), report.url);
    println!("  Status:    {}", status);
    println!("  Source:    {}", source);
    if report.cacheable {
        println!(
            "  Strategy:  {} ({}, ttl {})",
            report.strategy,
            report.cache_name.dimmed(),
            format_ttl(report.ttl_secs.map(std::time::Duration::from_secs))
        );
    } else {
        println!("  Strategy:  {}", "none (not cached)".dimmed());
    }
    println!("  Size:      {}", format_size(report.size_bytes));
    if let Some(ct) = &report.content_type {
        println!("  Type:      {}", ct);
    }
    if let Some(ts) = report.cached_at {
        println!(
            "  Cached:    {} ({} ago)",
            format_timestamp_ms(ts),
            format_age(ts, now_millis())
        );
    }
    if report.revalidated {
        println!("  {} Cache refreshed in background", "✓".green());
    }
    if let Some(e) = &report.revalidation_error {
        println!("  {} Background refresh failed: {}", "⚠".yellow(), e);
    }
    for degradation in &report.degradations {
        println!("  {} {}", "⚠".yellow(), degradation);
    }
    if let Some(path) = out {
        println!("  Body written to {}", path.cyan());
    }
}
