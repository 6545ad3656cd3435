use axum::Router;
use botanist_service::config::BotanistConfig;
use botanist_service::services::providers::mock::{MockTextProvider, MockVisionProvider};
use botanist_service::services::providers::{TextProvider, VisionProvider};
use botanist_service::startup::{build_router, AppState, Application};
use service_core::config::Config;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;

pub const JPEG_DATA_URI: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQ==";

/// Configuration for tests: dev environment, no credentials, bundled page.
pub fn test_config(vars: &[(&str, &str)]) -> BotanistConfig {
    try_test_config(vars).expect("Failed to build test configuration")
}

pub fn try_test_config(vars: &[(&str, &str)]) -> Result<BotanistConfig, AppError> {
    let mut map: HashMap<String, String> = HashMap::new();
    map.insert(
        "STATIC_DIR".to_string(),
        concat!(env!("CARGO_MANIFEST_DIR"), "/public").to_string(),
    );
    for (key, value) in vars {
        map.insert(key.to_string(), value.to_string());
    }

    let common = Config {
        port: 0, // Random port
        log_level: "info".to_string(),
    };
    BotanistConfig::from_lookup(common, |key| map.get(key).cloned())
}

/// Router wired to the given mocks, for `oneshot` requests.
pub fn test_router(
    config: BotanistConfig,
    text: Arc<MockTextProvider>,
    vision: Arc<MockVisionProvider>,
) -> Router {
    let text: Arc<dyn TextProvider> = text;
    let vision: Arc<dyn VisionProvider> = vision;
    build_router(AppState::new(config, text, vision))
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub text: Arc<MockTextProvider>,
    pub vision: Arc<MockVisionProvider>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(
            test_config(&[]),
            MockTextProvider::new(),
            MockVisionProvider::with_labels(["Leaf", "Plant", "Green", "Houseplant"]),
        )
        .await
    }

    pub async fn spawn_with(
        config: BotanistConfig,
        text: MockTextProvider,
        vision: MockVisionProvider,
    ) -> Self {
        let text = Arc::new(text);
        let vision = Arc::new(vision);

        let app = Application::build_with_providers(config, text.clone(), vision.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            text,
            vision,
            client,
        }
    }

    pub async fn post_chat(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to send /chat request")
    }

    pub async fn post_chat_image(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat-image", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to send /chat-image request")
    }
}
