use serde::{Deserialize, Serialize};

/// A single tag returned by the image-labeling service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Human-readable label text. The service may omit it.
    #[serde(default)]
    pub description: Option<String>,

    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub score: f32,
}

impl Label {
    pub fn new(description: impl Into<String>, score: f32) -> Self {
        Self {
            description: Some(description.into()),
            score,
        }
    }

    /// The label text, if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }
}
