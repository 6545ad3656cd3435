//! Data-URI validation for uploaded plant photos.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const ANY_IMAGE_PREFIX: &str = "data:image/";
const JPEG_PREFIX: &str = "data:image/jpeg;base64,";

/// Which data-URI prefixes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePolicy {
    /// Any `data:image/...` URI.
    #[default]
    AnyImageMime,
    /// Only `data:image/jpeg;base64,`.
    JpegOnly,
}

impl ImagePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePolicy::AnyImageMime => "any-image-mime",
            ImagePolicy::JpegOnly => "jpeg-only",
        }
    }

    fn required_prefix(&self) -> &'static str {
        match self {
            ImagePolicy::AnyImageMime => ANY_IMAGE_PREFIX,
            ImagePolicy::JpegOnly => JPEG_PREFIX,
        }
    }
}

impl fmt::Display for ImagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any-image-mime" | "any" => Ok(ImagePolicy::AnyImageMime),
            "jpeg-only" | "jpeg" => Ok(ImagePolicy::JpegOnly),
            other => Err(format!(
                "unknown image policy '{}', expected 'any-image-mime' or 'jpeg-only'",
                other
            )),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("no image supplied")]
    Missing,

    #[error("image is not a data URI accepted by the {0} policy")]
    UnsupportedFormat(ImagePolicy),
}

/// Check `image` against `policy` and return its encoded payload.
///
/// The payload is everything after the first comma. A URI without a comma
/// passes validation with an empty payload; the vision call then fails and
/// the guide falls back to its placeholder description.
pub fn extract_payload(policy: ImagePolicy, image: Option<&str>) -> Result<&str, ImageError> {
    let image = image.filter(|i| !i.is_empty()).ok_or(ImageError::Missing)?;

    if !image.starts_with(policy.required_prefix()) {
        return Err(ImageError::UnsupportedFormat(policy));
    }

    Ok(image
        .split_once(',')
        .map(|(_, payload)| payload)
        .unwrap_or_default())
}
