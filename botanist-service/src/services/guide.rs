//! Request orchestration for both chat routes.
//!
//! Each call builds a fresh conversation, makes at most one vision call and
//! one generative call in sequence, and renders the answer. No retries.

use crate::models::Conversation;
use crate::services::conversation;
use crate::services::formatter::ResponseFormatter;
use crate::services::image::{self, ImageError, ImagePolicy};
use crate::services::labels;
use crate::services::metrics;
use crate::services::providers::{GenerationParams, ProviderError, TextProvider, VisionProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Behavior switches for the guide.
#[derive(Debug, Clone)]
pub struct GuideSettings {
    pub image_policy: ImagePolicy,
    pub escape_html: bool,
    /// Send the user's message as a seed turn as well as the live turn.
    pub repeat_message_in_history: bool,
    /// Upper bound for each external call.
    pub upstream_timeout: Duration,
    pub generation: GenerationParams,
}

impl Default for GuideSettings {
    fn default() -> Self {
        Self {
            image_policy: ImagePolicy::AnyImageMime,
            escape_html: false,
            repeat_message_in_history: true,
            upstream_timeout: Duration::from_secs(60),
            generation: GenerationParams::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GuideError {
    #[error("invalid image: {0}")]
    InvalidImage(#[from] ImageError),

    #[error("generation failed: {0}")]
    Generation(#[source] ProviderError),

    #[error("failed to render answer: {0}")]
    Render(#[from] askama::Error),
}

/// The plant guide orchestrator.
#[derive(Clone)]
pub struct PlantGuide {
    text_provider: Arc<dyn TextProvider>,
    vision_provider: Arc<dyn VisionProvider>,
    formatter: ResponseFormatter,
    settings: GuideSettings,
}

impl PlantGuide {
    pub fn new(
        text_provider: Arc<dyn TextProvider>,
        vision_provider: Arc<dyn VisionProvider>,
        settings: GuideSettings,
    ) -> Self {
        Self {
            text_provider,
            vision_provider,
            formatter: ResponseFormatter::new(settings.escape_html),
            settings,
        }
    }

    pub fn settings(&self) -> &GuideSettings {
        &self.settings
    }

    /// Answer a text question in the botanist persona.
    pub async fn chat(&self, message: &str) -> Result<String, GuideError> {
        let conversation =
            conversation::text_chat(message, self.settings.repeat_message_in_history);
        let answer = self.generate(&conversation).await?;
        Ok(self.formatter.format(&answer)?)
    }

    /// Produce care tips for an uploaded plant photo.
    ///
    /// Invalid images are rejected before any external call. Vision failures
    /// degrade to a placeholder description; generation failures do not.
    pub async fn chat_image(&self, image: Option<&str>) -> Result<String, GuideError> {
        let payload = image::extract_payload(self.settings.image_policy, image)?;

        let description = labels::describe_image(
            self.vision_provider.as_ref(),
            payload,
            self.settings.upstream_timeout,
        )
        .await;
        tracing::debug!(description = %description, "Described plant image");

        let conversation = conversation::image_chat(&description);
        let answer = self.generate(&conversation).await?;
        Ok(self.formatter.format(&answer)?)
    }

    /// Check both upstream providers.
    pub async fn health_check(&self) -> Result<(), ProviderError> {
        self.text_provider.health_check().await?;
        self.vision_provider.health_check().await
    }

    async fn generate(&self, conversation: &Conversation) -> Result<String, GuideError> {
        let timeout = self.settings.upstream_timeout;
        let start = Instant::now();

        let result = match tokio::time::timeout(
            timeout,
            self.text_provider
                .generate(conversation, &self.settings.generation),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout)),
        };
        metrics::record_provider_call("generative", result.is_ok(), start.elapsed());

        let response = result.map_err(GuideError::Generation)?;
        tracing::info!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            finish_reason = ?response.finish_reason,
            "Generated plant guide answer"
        );

        Ok(response.text)
    }
}
