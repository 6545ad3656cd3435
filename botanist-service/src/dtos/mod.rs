use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageChatRequest {
    /// Photo as a `data:image/...;base64,` URI.
    #[serde(default)]
    pub image: Option<String>,
}

/// Body of every chat reply, success or failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}
