//! Image format negotiation and responsive image defaults
//!
//! A JPEG or PNG is rewritten to a pre-generated AVIF or WebP sibling only
//! when the client decodes that format and the sibling actually exists on
//! the origin. Both checks must pass, otherwise the image is left alone.

pub mod format;

use std::sync::{Arc, LazyLock, OnceLock};

use log::debug;
use regex::Regex;
use serde::Serialize;
use url::Url;

pub use format::{DEFAULT_IMAGE_ACCEPT, FormatSupport, ImageFormat};

use crate::client::Fetcher;

/// Widths a srcset is generated for
pub const SRCSET_BREAKPOINTS: [u32; 5] = [480, 768, 1024, 1280, 1920];

/// `sizes` applied alongside a generated srcset
pub const DEFAULT_SIZES: &str = "(max-width: 768px) 100vw, 50vw";

static RASTER_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(?:jpe?g|png)(?P<rest>[?#].*)?$").expect("valid raster pattern")
});

static IMAGE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<stem>[^?#]+)\.(?P<ext>jpe?g|png|webp|avif|gif)(?P<rest>[?#].*)?$")
        .expect("valid image pattern")
});

/// The attributes of an `<img>` the optimizer reads and writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageElement {
    pub src: Option<String>,
    /// Deferred source of a lazy image
    pub data_src: Option<String>,
    pub loading: Option<String>,
    pub decoding: Option<String>,
    pub srcset: Option<String>,
    pub sizes: Option<String>,
}

impl ImageElement {
    pub fn with_src(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            ..Self::default()
        }
    }

    pub fn lazy(data_src: impl Into<String>) -> Self {
        Self {
            data_src: Some(data_src.into()),
            ..Self::default()
        }
    }

    /// The source that will eventually be loaded
    pub fn effective_src(&self) -> Option<&str> {
        self.data_src.as_deref().or(self.src.as_deref())
    }
}

/// Rewrites images to modern formats
pub struct AssetOptimizer {
    fetcher: Arc<dyn Fetcher>,
    accept: String,
    base: Option<Url>,
    support: OnceLock<FormatSupport>,
}

impl AssetOptimizer {
    /// `base` resolves relative image URLs for the existence probe
    pub fn new(fetcher: Arc<dyn Fetcher>, accept: impl Into<String>, base: Option<Url>) -> Self {
        Self {
            fetcher,
            accept: accept.into(),
            base,
            support: OnceLock::new(),
        }
    }

    /// Client capabilities, probed once
    pub fn format_support(&self) -> FormatSupport {
        *self.support.get_or_init(|| {
            let support = FormatSupport::from_accept(&self.accept);
            debug!("Image format support: {:?}", support);
            support
        })
    }

    /// Rewrite the image's effective source to the best available format.
    ///
    /// Sets `loading=lazy` and `decoding=async` unless already present.
    /// Returns the format switched to, if any.
    pub async fn optimize_image(&self, img: &mut ImageElement) -> Option<ImageFormat> {
        let chosen = match img.effective_src() {
            Some(current) => self.negotiate(current).await,
            None => None,
        };

        if let Some((format, candidate)) = &chosen {
            debug!("Using {} variant {}", format, candidate);
            let target = if img.data_src.is_some() {
                &mut img.data_src
            } else {
                &mut img.src
            };
            *target = Some(candidate.clone());
        }

        img.loading.get_or_insert_with(|| "lazy".to_string());
        img.decoding.get_or_insert_with(|| "async".to_string());

        chosen.map(|(format, _)| format)
    }

    /// Attach a srcset (and default sizes) for the image's current source
    /// when it has none. Variants are not checked for existence.
    pub fn apply_srcset(&self, img: &mut ImageElement) {
        if img.srcset.is_some() {
            return;
        }
        let Some(srcset) = img.effective_src().and_then(generate_srcset) else {
            return;
        };
        img.srcset = Some(srcset);
        img.sizes.get_or_insert_with(|| DEFAULT_SIZES.to_string());
    }

    async fn negotiate(&self, current: &str) -> Option<(ImageFormat, String)> {
        if !RASTER_EXTENSION.is_match(current) {
            return None;
        }

        let support = self.format_support();
        for format in ImageFormat::PREFERENCE {
            if !support.supports(format) {
                continue;
            }

            let candidate = swap_extension(current, format);
            let Some(probe) = self.resolve(&candidate) else {
                debug!("Cannot resolve {} for existence probe", candidate);
                return None;
            };

            if self.fetcher.exists(&probe).await {
                return Some((format, candidate));
            }
            debug!("No {} variant at {}", format, probe);
        }

        None
    }

    fn resolve(&self, url: &str) -> Option<Url> {
        match Url::parse(url) {
            Ok(url) => Some(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base.as_ref()?.join(url).ok(),
            Err(_) => None,
        }
    }
}

/// Sibling URL with the raster extension replaced, query kept
fn swap_extension(url: &str, format: ImageFormat) -> String {
    RASTER_EXTENSION
        .replace(url, |caps: &regex::Captures| {
            let rest = caps.name("rest").map_or("", |m| m.as_str());
            format!(".{}{}", format.extension(), rest)
        })
        .into_owned()
}

/// `name-{w}w.ext {w}w` for every breakpoint, or `None` for non-image URLs
pub fn generate_srcset(url: &str) -> Option<String> {
    let caps = IMAGE_PATH.captures(url)?;
    let stem = &caps["stem"];
    let ext = &caps["ext"];
    let rest = caps.name("rest").map_or("", |m| m.as_str());

    let candidates: Vec<String> = SRCSET_BREAKPOINTS
        .iter()
        .map(|w| format!("{}-{}w.{}{} {}w", stem, w, ext, rest, w))
        .collect();
    Some(candidates.join(", "))
}
