//! Stand-in for a provider whose credentials are not set.
//!
//! Every call fails with [`ProviderError::NotConfigured`], so requests take the
//! normal upstream-failure path and readiness reports the gap.

use super::{GenerationParams, ProviderError, ProviderResponse, TextProvider, VisionProvider};
use crate::models::{Conversation, Label};
use async_trait::async_trait;

pub struct UnconfiguredProvider {
    setting: &'static str,
}

impl UnconfiguredProvider {
    /// `setting` names the environment variable that would configure it.
    pub fn new(setting: &'static str) -> Self {
        Self { setting }
    }

    fn error(&self) -> ProviderError {
        ProviderError::NotConfigured(format!("{} is not set", self.setting))
    }
}

#[async_trait]
impl TextProvider for UnconfiguredProvider {
    async fn generate(
        &self,
        conversation: &Conversation,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        tracing::warn!(
            setting = self.setting,
            turns = conversation.history.len(),
            "Text generation requested without credentials"
        );
        Err(self.error())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Err(self.error())
    }
}

#[async_trait]
impl VisionProvider for UnconfiguredProvider {
    async fn detect_labels(&self, _image_base64: &str) -> Result<Vec<Label>, ProviderError> {
        Err(self.error())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Err(self.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_is_not_configured() {
        let provider = UnconfiguredProvider::new("GEMINI_API_KEY");

        let err = TextProvider::generate(
            &provider,
            &Conversation::default(),
            &GenerationParams::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(ref msg) if msg.contains("GEMINI_API_KEY")));

        assert!(matches!(
            provider.detect_labels("abc").await,
            Err(ProviderError::NotConfigured(_))
        ));
        assert!(TextProvider::health_check(&provider).await.is_err());
        assert!(VisionProvider::health_check(&provider).await.is_err());
    }
}
