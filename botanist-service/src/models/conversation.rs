//! One-shot conversation sent to the generative model.

use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
        }
    }
}

/// A role-tagged text turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }
}

/// A fresh conversation: seed turns followed by the live message.
///
/// Nothing outlives the request that built it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    /// Seed turns establishing persona and instructions.
    pub history: Vec<Turn>,

    /// Text submitted as the triggering turn. May be empty.
    pub live: String,
}

impl Conversation {
    pub fn new(history: Vec<Turn>, live: impl Into<String>) -> Self {
        Self {
            history,
            live: live.into(),
        }
    }

    /// The live turn, or `None` when nothing is submitted beyond the seed.
    pub fn live_turn(&self) -> Option<Turn> {
        if self.live.is_empty() {
            None
        } else {
            Some(Turn::user(self.live.clone()))
        }
    }

    /// Every turn in submission order: seed first, then the live turn.
    pub fn turns(&self) -> Vec<Turn> {
        let mut turns = self.history.clone();
        turns.extend(self.live_turn());
        turns
    }

    /// Seed text joined with newlines, for logging and assertions.
    pub fn seed_text(&self) -> String {
        self.history
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
