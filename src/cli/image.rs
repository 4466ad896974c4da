//! Image command: format negotiation and responsive defaults

use colored::Colorize;
use serde::Serialize;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::optimizer::{FormatSupport, ImageElement, ImageFormat};
use crate::output::print_json;
use crate::output::table::format_fields;

#[derive(Debug, Serialize)]
struct ImageReport {
    original: String,
    support: FormatSupport,
    format: Option<ImageFormat>,
    element: ImageElement,
}

pub async fn run(ctx: &CommandContext, url: &str, accept: Option<&str>, lazy: bool) -> Result<()> {
    let optimizer = ctx.optimizer(accept);
    let mut element = if lazy {
        ImageElement::lazy(url)
    } else {
        ImageElement::with_src(url)
    };

    let format = optimizer.optimize_image(&mut element).await;
    optimizer.apply_srcset(&mut element);

    let report = ImageReport {
        original: url.to_string(),
        support: optimizer.format_support(),
        format,
        element,
    };

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => println!("{}", format_fields(&element_fields(&report))),
        OutputFormat::Pretty => {
            match report.format {
                Some(f) => println!(
                    "{} Rewritten to {} ({})",
                    "✓".green(),
                    f.to_string().bold(),
                    f.mime_type().dimmed()
                ),
                None => println!("{} Kept original format", "○".dimmed()),
            }
            for (name, value) in element_fields(&report) {
                println!("  {:<10} {}", name, value);
            }
        }
    }
    Ok(())
}

fn element_fields(report: &ImageReport) -> Vec<(&'static str, String)> {
    let el = &report.element;
    [
        ("src", el.src.clone()),
        ("data-src", el.data_src.clone()),
        ("loading", el.loading.clone()),
        ("decoding", el.decoding.clone()),
        ("srcset", el.srcset.clone()),
        ("sizes", el.sizes.clone()),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name, v)))
    .collect()
}
