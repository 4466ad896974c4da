//! Classify command: URL → class, strategy, cache, TTL

use serde::Serialize;
use tabled::Tabled;

use crate::cache::matcher::{AssetClass, AssetPatternMatcher};
use crate::cache::{Strategy, StrategyDescriptor};
use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::Result;
use crate::output::formatters::format_ttl;
use crate::output::print_rows;

#[derive(Debug, Serialize, Tabled)]
pub struct ClassifyRow {
    #[tabled(rename = "URL")]
    pub url: String,
    #[tabled(rename = "CLASS")]
    pub class: AssetClass,
    #[tabled(rename = "STRATEGY")]
    pub strategy: Strategy,
    #[tabled(rename = "CACHE")]
    pub cache: String,
    #[tabled(rename = "TTL")]
    #[serde(skip)]
    pub ttl: String,
    #[tabled(skip)]
    pub ttl_secs: Option<u64>,
}

impl ClassifyRow {
    fn new(url: &str, descriptor: StrategyDescriptor) -> Self {
        Self {
            url: url.to_string(),
            class: descriptor.class,
            strategy: descriptor.strategy,
            cache: descriptor.cache_name,
            ttl: format_ttl(descriptor.ttl),
            ttl_secs: descriptor.ttl.map(|t| t.as_secs()),
        }
    }
}

/// Classify each URL without touching the network or the store
pub fn run(opts: &GlobalOptions, urls: &[String]) -> Result<()> {
    let config = Config::load_at(opts.config_ref())?;
    let namespace = config.namespace();
    let matcher = AssetPatternMatcher::new();

    let rows: Vec<ClassifyRow> = urls
        .iter()
        .map(|url| {
            let descriptor = StrategyDescriptor::for_class(matcher.classify(url), &namespace);
            ClassifyRow::new(url, descriptor)
        })
        .collect();

    print_rows(&rows, opts.format)
}
