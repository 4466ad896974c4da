//! Request classification by URL pattern
//!
//! Rules are an explicit ordered table of `(pattern, class)` pairs. Each
//! pattern is tested against the URL path and then the full href; the first
//! matching rule decides the class, so table order is the precedence order.

use std::fmt;

use regex::Regex;
use serde::Serialize;
use url::Url;

/// Asset classes, each backed by its own named cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// HTML, JS, CSS and the web manifest
    Static,
    /// Raster and vector images
    Image,
    /// Web fonts
    Font,
    /// JSON data and `/api/` endpoints
    Api,
    /// Third-party CDN resources
    Cdn,
    /// Everything else
    Dynamic,
}

impl AssetClass {
    /// All classes in matching order (Dynamic is the fallback).
    pub const ALL: [AssetClass; 6] = [
        AssetClass::Static,
        AssetClass::Image,
        AssetClass::Font,
        AssetClass::Api,
        AssetClass::Cdn,
        AssetClass::Dynamic,
    ];

    /// Segment used in the versioned cache name
    pub fn cache_segment(&self) -> &'static str {
        match self {
            AssetClass::Static => "static",
            AssetClass::Image => "images",
            AssetClass::Font => "fonts",
            AssetClass::Api => "api",
            AssetClass::Cdn => "cdn",
            AssetClass::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssetClass::Static => "static",
            AssetClass::Image => "image",
            AssetClass::Font => "font",
            AssetClass::Api => "api",
            AssetClass::Cdn => "cdn",
            AssetClass::Dynamic => "dynamic",
        };
        f.write_str(label)
    }
}

/// Built-in rule table. Order matters: static, images, fonts, api, cdn.
const DEFAULT_RULES: &[(&str, AssetClass)] = &[
    // STATIC_ASSETS
    (r"\.(?:js|css|html)$", AssetClass::Static),
    (r"^/$", AssetClass::Static),
    (r"/manifest\.json$", AssetClass::Static),
    // IMAGES
    (r"\.(?:png|jpe?g|gif|svg|webp|avif|ico)$", AssetClass::Image),
    // FONTS
    (r"\.(?:woff2?|ttf|otf|eot)$", AssetClass::Font),
    // API_ENDPOINTS
    (r"/api/", AssetClass::Api),
    (r"\.json$", AssetClass::Api),
    // CDN_RESOURCES
    (r"^https://(?:cdn|cdnjs)\.", AssetClass::Cdn),
    (r"^https://fonts\.(?:googleapis|gstatic)\.com", AssetClass::Cdn),
    (r"^https://unpkg\.com", AssetClass::Cdn),
    (r"^https://cdn\.jsdelivr\.net", AssetClass::Cdn),
];

/// A single compiled classification rule
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub class: AssetClass,
    pub regex: Regex,
}

/// Ordered URL classifier
#[derive(Debug, Clone)]
pub struct AssetPatternMatcher {
    rules: Vec<PatternRule>,
}

impl Default for AssetPatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetPatternMatcher {
    /// Matcher with the built-in rule table
    pub fn new() -> Self {
        Self::from_patterns(DEFAULT_RULES).expect("built-in asset patterns are valid regexes")
    }

    /// Compile a custom rule table, keeping its order
    pub fn from_patterns(patterns: &[(&str, AssetClass)]) -> Result<Self, regex::Error> {
        let rules = patterns
            .iter()
            .map(|(pattern, class)| {
                Ok(PatternRule {
                    class: *class,
                    regex: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { rules })
    }

    /// Classify an absolute or relative URL.
    ///
    /// Relative input is matched as-is for the href and with any query or
    /// fragment stripped for the path. No other normalization happens.
    pub fn classify(&self, url: &str) -> AssetClass {
        match Url::parse(url) {
            Ok(parsed) => self.classify_parts(parsed.path(), parsed.as_str()),
            Err(_) => self.classify_parts(relative_path(url), url),
        }
    }

    /// Classify an already parsed URL
    pub fn classify_url(&self, url: &Url) -> AssetClass {
        self.classify_parts(url.path(), url.as_str())
    }

    fn classify_parts(&self, path: &str, href: &str) -> AssetClass {
        self.rules
            .iter()
            .find(|rule| rule.regex.is_match(path) || rule.regex.is_match(href))
            .map(|rule| rule.class)
            .unwrap_or(AssetClass::Dynamic)
    }

    #[cfg(test)]
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }
}

fn relative_path(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}
