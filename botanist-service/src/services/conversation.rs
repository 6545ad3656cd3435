//! Builds the one-shot conversations sent to the generative model.

use crate::models::{Conversation, Turn};

/// Persona instruction seeded before every text chat.
pub const BOTANIST_PERSONA: &str = "You are a highly specialized AI botanist. Answer only questions related to plants. Make the response clear, user-friendly, and well-structured. Highlight subheadings in bold.";

/// Seed for a text chat: persona, then (optionally) the user's message.
///
/// With `repeat_message_in_history` the message appears both as the second
/// seed turn and as the live turn.
pub fn text_chat(message: &str, repeat_message_in_history: bool) -> Conversation {
    let mut history = vec![Turn::user(BOTANIST_PERSONA)];
    if repeat_message_in_history {
        history.push(Turn::user(message));
    }

    Conversation::new(history, message)
}

/// Seed for an image chat. The whole instruction lives in the seed turn and
/// the live turn is empty.
pub fn image_chat(description: &str) -> Conversation {
    Conversation::new(
        vec![Turn::user(format!(
            "Provide care and maintenance tips for this plant based on the following description: {}",
            description
        ))],
        "",
    )
}
