mod common;

use botanist_service::dtos::ChatResponse;
use botanist_service::handlers::chat::{IMAGE_FAILED, IMAGE_TOO_LARGE, INVALID_IMAGE};
use botanist_service::models::Label;
use botanist_service::services::labels::UNIDENTIFIED_PLANT;
use botanist_service::services::providers::mock::{MockTextProvider, MockVisionProvider};
use common::{test_config, TestApp, JPEG_DATA_URI};
use serde_json::json;
use std::time::Duration;

fn jpeg_payload() -> &'static str {
    JPEG_DATA_URI
        .split_once(',')
        .map(|(_, payload)| payload)
        .unwrap_or_default()
}

#[tokio::test]
async fn invalid_image_is_rejected_without_external_calls() {
    let app = TestApp::spawn().await;

    let response = app.post_chat_image(json!({ "image": "notadatauri" })).await;

    assert_eq!(response.status(), 400);
    let body: ChatResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(body.response, INVALID_IMAGE);
    assert_eq!(app.vision.calls(), 0);
    assert_eq!(app.text.calls(), 0);
}

#[tokio::test]
async fn missing_image_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app.post_chat_image(json!({})).await;

    assert_eq!(response.status(), 400);
    assert_eq!(app.vision.calls(), 0);
    assert_eq!(app.text.calls(), 0);
}

#[tokio::test]
async fn top_three_labels_seed_the_conversation() {
    let app = TestApp::spawn().await;

    let response = app.post_chat_image(json!({ "image": JPEG_DATA_URI })).await;

    assert_eq!(response.status(), 200);
    let body: ChatResponse = response.json().await.expect("Failed to parse response");
    assert!(body.response.contains(">Guide</h3>"));

    assert_eq!(app.vision.last_image().as_deref(), Some(jpeg_payload()));
    let conversation = app.text.last_conversation().expect("No conversation sent");
    assert!(conversation
        .seed_text()
        .contains("Identified plant characteristics: Leaf, Plant, Green"));
    assert!(!conversation.seed_text().contains("Houseplant"));
    assert!(conversation.live.is_empty());
}

#[tokio::test]
async fn vision_failure_degrades_to_placeholder() {
    let app = TestApp::spawn_with(
        test_config(&[]),
        MockTextProvider::new(),
        MockVisionProvider::failing(),
    )
    .await;

    let response = app.post_chat_image(json!({ "image": JPEG_DATA_URI })).await;

    assert_eq!(response.status(), 200);
    assert_eq!(app.vision.calls(), 1);
    assert_eq!(app.text.calls(), 1);
    let conversation = app.text.last_conversation().expect("No conversation sent");
    assert!(conversation.seed_text().contains(UNIDENTIFIED_PLANT));
}

#[tokio::test]
async fn blank_labels_fall_back_to_placeholder() {
    let app = TestApp::spawn_with(
        test_config(&[]),
        MockTextProvider::new(),
        MockVisionProvider::with_raw_labels(vec![
            Label {
                description: None,
                score: 0.9,
            },
            Label::new("", 0.8),
        ]),
    )
    .await;

    let response = app.post_chat_image(json!({ "image": JPEG_DATA_URI })).await;

    assert_eq!(response.status(), 200);
    let conversation = app.text.last_conversation().expect("No conversation sent");
    assert!(conversation.seed_text().contains(UNIDENTIFIED_PLANT));
}

#[tokio::test]
async fn generation_failure_returns_fixed_apology() {
    let app = TestApp::spawn_with(
        test_config(&[]),
        MockTextProvider::failing(),
        MockVisionProvider::with_labels(["Leaf", "Plant", "Green"]),
    )
    .await;

    let response = app.post_chat_image(json!({ "image": JPEG_DATA_URI })).await;

    assert_eq!(response.status(), 500);
    let body: ChatResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(body.response, IMAGE_FAILED);
    assert_eq!(app.vision.calls(), 1);
    assert_eq!(app.text.calls(), 1);
}

#[tokio::test]
async fn jpeg_only_policy_rejects_png() {
    let app = TestApp::spawn_with(
        test_config(&[("IMAGE_POLICY", "jpeg-only")]),
        MockTextProvider::new(),
        MockVisionProvider::with_labels(["Leaf"]),
    )
    .await;

    let png = app
        .post_chat_image(json!({ "image": "data:image/png;base64,iVBORw0KGgo=" }))
        .await;
    assert_eq!(png.status(), 400);
    assert_eq!(app.vision.calls(), 0);

    let jpeg = app.post_chat_image(json!({ "image": JPEG_DATA_URI })).await;
    assert_eq!(jpeg.status(), 200);
    assert_eq!(app.vision.calls(), 1);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = TestApp::spawn_with(
        test_config(&[("BODY_LIMIT_BYTES", "1024")]),
        MockTextProvider::new(),
        MockVisionProvider::with_labels(["Leaf"]),
    )
    .await;

    let image = format!("data:image/jpeg;base64,{}", "A".repeat(4096));
    let response = app.post_chat_image(json!({ "image": image })).await;

    assert_eq!(response.status(), 413);
    let body: ChatResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(body.response, IMAGE_TOO_LARGE);
    assert_eq!(app.vision.calls(), 0);
}

#[tokio::test]
async fn slow_vision_degrades_to_placeholder() {
    let app = TestApp::spawn_with(
        test_config(&[("UPSTREAM_TIMEOUT_SECS", "1")]),
        MockTextProvider::new(),
        MockVisionProvider::with_labels(["Leaf"]).with_delay(Duration::from_millis(1500)),
    )
    .await;

    let response = app.post_chat_image(json!({ "image": JPEG_DATA_URI })).await;

    assert_eq!(response.status(), 200);
    assert_eq!(app.vision.calls(), 1);
    assert_eq!(app.text.calls(), 1);
    let conversation = app.text.last_conversation().expect("No conversation sent");
    assert!(conversation.seed_text().contains(UNIDENTIFIED_PLANT));
}

#[tokio::test]
async fn slow_generation_returns_fixed_apology() {
    let app = TestApp::spawn_with(
        test_config(&[("UPSTREAM_TIMEOUT_SECS", "1")]),
        MockTextProvider::new().with_delay(Duration::from_millis(1500)),
        MockVisionProvider::with_labels(["Leaf"]),
    )
    .await;

    let response = app.post_chat_image(json!({ "image": JPEG_DATA_URI })).await;

    assert_eq!(response.status(), 500);
    let body: ChatResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(body.response, IMAGE_FAILED);
    assert_eq!(app.text.calls(), 1);
}
