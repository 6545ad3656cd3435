//! HTTP handlers for botanist-service.

pub mod chat;
pub mod health;
pub mod metrics;

pub use chat::{chat, chat_image, ChatError};
pub use health::{health_check, readiness_check};
