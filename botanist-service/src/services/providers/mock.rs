//! Mock provider implementations for testing and credential-less development.

use super::{
    FinishReason, GenerationParams, ProviderError, ProviderResponse, TextProvider, VisionProvider,
};
use crate::models::{Conversation, Label};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock text provider that records every conversation it receives.
pub struct MockTextProvider {
    reply: Option<String>,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    conversations: Mutex<Vec<Conversation>>,
}

impl MockTextProvider {
    /// Echo the live turn (or the seed, when the live turn is empty).
    pub fn new() -> Self {
        Self {
            reply: None,
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
            conversations: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Self::new()
        }
    }

    /// Fail every call with an API error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_conversation(&self) -> Option<Conversation> {
        self.conversations
            .lock()
            .ok()
            .and_then(|c| c.last().cloned())
    }
}

impl Default for MockTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        conversation: &Conversation,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.conversations.lock() {
            seen.push(conversation.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(ProviderError::ApiError("Mock text provider failure".to_string()));
        }

        let text = match &self.reply {
            Some(reply) => reply.clone(),
            None if conversation.live.is_empty() => {
                format!("**Mock guide**: {}", conversation.seed_text())
            }
            None => format!("**Mock guide**: {}", conversation.live),
        };

        Ok(ProviderResponse {
            input_tokens: conversation.seed_text().len() as i32 / 4,
            output_tokens: text.len() as i32 / 4,
            text,
            finish_reason: FinishReason::Complete,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.fail {
            Err(ProviderError::NotConfigured(
                "Mock text provider set to fail".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Mock vision provider returning a fixed label set.
pub struct MockVisionProvider {
    labels: Vec<Label>,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    images: Mutex<Vec<String>>,
}

impl MockVisionProvider {
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = labels
            .into_iter()
            .enumerate()
            .map(|(i, text)| Label::new(text, 1.0 - i as f32 * 0.01))
            .collect();

        Self {
            labels,
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
            images: Mutex::new(Vec::new()),
        }
    }

    /// Return exactly these labels, including blank ones.
    pub fn with_raw_labels(labels: Vec<Label>) -> Self {
        Self {
            labels,
            ..Self::with_labels(Vec::<String>::new())
        }
    }

    /// Fail every call with a network error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_labels(Vec::<String>::new())
        }
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The last base64 payload received.
    pub fn last_image(&self) -> Option<String> {
        self.images.lock().ok().and_then(|i| i.last().cloned())
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    async fn detect_labels(&self, image_base64: &str) -> Result<Vec<Label>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.images.lock() {
            seen.push(image_base64.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(ProviderError::NetworkError(
                "Mock vision provider failure".to_string(),
            ));
        }

        Ok(self.labels.clone())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.fail {
            Err(ProviderError::NotConfigured(
                "Mock vision provider set to fail".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}
