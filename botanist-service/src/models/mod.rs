//! Request-scoped domain models for the plant guide.

pub mod conversation;
pub mod label;

pub use conversation::{Conversation, Role, Turn};
pub use label::Label;
