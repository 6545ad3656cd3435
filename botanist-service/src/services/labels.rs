//! Turns vision labels into a short plant description.

use crate::models::Label;
use crate::services::metrics;
use crate::services::providers::{ProviderError, VisionProvider};
use std::time::{Duration, Instant};

/// Labels kept for the description.
pub const MAX_LABELS: usize = 3;

/// Description used when labeling fails or yields nothing usable.
pub const UNIDENTIFIED_PLANT: &str = "Unable to identify plant from the image.";

/// Join the first usable labels into a description, in service order.
pub fn describe_labels(labels: &[Label]) -> Option<String> {
    let kept: Vec<&str> = labels
        .iter()
        .filter_map(Label::text)
        .take(MAX_LABELS)
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(format!("Identified plant characteristics: {}", kept.join(", ")))
    }
}

/// Label the image and describe it, degrading to [`UNIDENTIFIED_PLANT`].
///
/// Never fails: vision errors and timeouts are logged and replaced by the
/// placeholder so the rest of the pipeline still runs.
pub async fn describe_image(
    vision: &dyn VisionProvider,
    image_base64: &str,
    timeout: Duration,
) -> String {
    let start = Instant::now();
    let result = match tokio::time::timeout(timeout, vision.detect_labels(image_base64)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout)),
    };
    metrics::record_provider_call("vision", result.is_ok(), start.elapsed());

    match result {
        Ok(labels) => describe_labels(&labels).unwrap_or_else(|| {
            tracing::warn!(label_count = labels.len(), "Vision returned no usable labels");
            UNIDENTIFIED_PLANT.to_string()
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Vision labeling failed, using placeholder description");
            UNIDENTIFIED_PLANT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::MockVisionProvider;

    #[test]
    fn keeps_first_three_in_order() {
        let labels = vec![
            Label::new("Leaf", 0.9),
            Label::new("Plant", 0.95),
            Label::new("Green", 0.8),
            Label::new("Flower", 0.99),
        ];
        assert_eq!(
            describe_labels(&labels).as_deref(),
            Some("Identified plant characteristics: Leaf, Plant, Green")
        );
    }

    #[test]
    fn skips_blank_labels() {
        let labels = vec![
            Label {
                description: None,
                score: 0.99,
            },
            Label::new("", 0.98),
            Label::new("Fern", 0.9),
        ];
        assert_eq!(
            describe_labels(&labels).as_deref(),
            Some("Identified plant characteristics: Fern")
        );
    }

    #[test]
    fn repeated_labels_are_kept() {
        let labels = vec![
            Label::new("Leaf", 0.9),
            Label::new("Leaf", 0.85),
            Label::new("Plant", 0.8),
            Label::new("Green", 0.7),
        ];
        assert_eq!(
            describe_labels(&labels).as_deref(),
            Some("Identified plant characteristics: Leaf, Leaf, Plant")
        );
    }

    #[test]
    fn no_usable_labels_is_none() {
        assert_eq!(describe_labels(&[]), None);
    }

    #[tokio::test]
    async fn vision_failure_falls_back() {
        let vision = MockVisionProvider::failing();
        let description = describe_image(&vision, "abc", Duration::from_secs(1)).await;
        assert_eq!(description, UNIDENTIFIED_PLANT);
        assert_eq!(vision.calls(), 1);
    }

    #[tokio::test]
    async fn slow_vision_times_out_to_placeholder() {
        let vision =
            MockVisionProvider::with_labels(["Leaf"]).with_delay(Duration::from_millis(500));
        let description = describe_image(&vision, "abc", Duration::from_millis(50)).await;
        assert_eq!(description, UNIDENTIFIED_PLANT);
        assert_eq!(vision.calls(), 1);
    }

    #[tokio::test]
    async fn empty_label_set_falls_back() {
        let vision = MockVisionProvider::with_labels(Vec::<String>::new());
        let description = describe_image(&vision, "abc", Duration::from_secs(1)).await;
        assert_eq!(description, UNIDENTIFIED_PLANT);
    }
}
