//! Modern image format detection from the client's Accept header

use std::fmt;

use serde::Serialize;

/// Accept header Chromium sends for `<img>` loads
pub const DEFAULT_IMAGE_ACCEPT: &str =
    "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";

/// Formats an image can be rewritten to, in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Avif,
    Webp,
}

impl ImageFormat {
    pub const PREFERENCE: [ImageFormat; 2] = [ImageFormat::Avif, ImageFormat::Webp];

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Avif => "avif",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Avif => "image/avif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Which modern formats the client decodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FormatSupport {
    pub avif: bool,
    pub webp: bool,
}

impl FormatSupport {
    /// Parse an Accept header.
    ///
    /// Only explicit media types count; `image/*` says nothing about AVIF.
    /// A media range with `q=0` is a refusal.
    pub fn from_accept(accept: &str) -> Self {
        let mut support = Self::default();

        for range in accept.split(',') {
            let mut parts = range.split(';').map(str::trim);
            let media = parts.next().unwrap_or_default().to_ascii_lowercase();
            let refused = parts.any(|param| {
                param
                    .strip_prefix("q=")
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });
            if refused {
                continue;
            }

            match media.as_str() {
                "image/avif" => support.avif = true,
                "image/webp" => support.webp = true,
                _ => {}
            }
        }

        support
    }

    pub fn supports(&self, format: ImageFormat) -> bool {
        match format {
            ImageFormat::Avif => self.avif,
            ImageFormat::Webp => self.webp,
        }
    }
}
