use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use validator::Validate;

use crate::dtos::{ChatRequest, ChatResponse, ImageChatRequest};
use crate::services::GuideError;
use crate::startup::AppState;

pub const INVALID_MESSAGE: &str = "Please enter a question about plants.";
pub const INVALID_IMAGE: &str = "Invalid image format. Please upload a valid image file.";
pub const IMAGE_TOO_LARGE: &str = "The image is too large. Please upload a smaller file.";
pub const CHAT_FAILED: &str = "Something went wrong. Please try again.";
pub const IMAGE_FAILED: &str = "Failed to analyze the image. Please try again.";

/// Route-boundary failures. Bodies carry a fixed message and never any
/// upstream detail.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid chat message")]
    InvalidMessage,

    #[error("invalid image payload")]
    InvalidImage,

    #[error("request body too large")]
    TooLarge,

    #[error("chat generation failed")]
    ChatFailed,

    #[error("image analysis failed")]
    ImageFailed,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ChatError::InvalidMessage => (StatusCode::BAD_REQUEST, INVALID_MESSAGE),
            ChatError::InvalidImage => (StatusCode::BAD_REQUEST, INVALID_IMAGE),
            ChatError::TooLarge => (StatusCode::PAYLOAD_TOO_LARGE, IMAGE_TOO_LARGE),
            ChatError::ChatFailed => (StatusCode::INTERNAL_SERVER_ERROR, CHAT_FAILED),
            ChatError::ImageFailed => (StatusCode::INTERNAL_SERVER_ERROR, IMAGE_FAILED),
        };

        (
            status,
            Json(ChatResponse {
                response: message.to_string(),
            }),
        )
            .into_response()
    }
}

#[tracing::instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let Json(request) = payload.map_err(|e| {
        tracing::warn!(error = %e, "Rejected /chat body");
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ChatError::TooLarge
        } else {
            ChatError::InvalidMessage
        }
    })?;
    request.validate().map_err(|_| ChatError::InvalidMessage)?;

    let response = state.guide.chat(&request.message).await.map_err(|e| {
        tracing::error!(error = %e, "Error in /chat endpoint");
        ChatError::ChatFailed
    })?;

    Ok(Json(ChatResponse { response }))
}

#[tracing::instrument(skip(state, payload))]
pub async fn chat_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let Json(request) = payload.map_err(|e| {
        tracing::warn!(error = %e, "Rejected /chat-image body");
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ChatError::TooLarge
        } else {
            ChatError::InvalidImage
        }
    })?;

    let response = state
        .guide
        .chat_image(request.image.as_deref())
        .await
        .map_err(|e| match e {
            GuideError::InvalidImage(reason) => {
                tracing::warn!(reason = %reason, "Rejected image payload");
                ChatError::InvalidImage
            }
            err @ (GuideError::Generation(_) | GuideError::Render(_)) => {
                tracing::error!(error = %err, "Error in /chat-image endpoint");
                ChatError::ImageFailed
            }
        })?;

    Ok(Json(ChatResponse { response }))
}
