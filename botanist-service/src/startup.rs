//! Application startup and lifecycle management.
//!
//! Wires the configured providers into the guide and serves the chat API,
//! probes, metrics and the static landing page from one HTTP listener.

use crate::config::BotanistConfig;
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::unconfigured::UnconfiguredProvider;
use crate::services::providers::vision::{CloudVisionProvider, VisionConfig};
use crate::services::providers::{TextProvider, VisionProvider};
use crate::services::{GuideSettings, PlantGuide};
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{http_trace_layer, request_id_middleware},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BotanistConfig,
    pub guide: PlantGuide,
}

impl AppState {
    pub fn new(
        config: BotanistConfig,
        text_provider: Arc<dyn TextProvider>,
        vision_provider: Arc<dyn VisionProvider>,
    ) -> Self {
        let settings = GuideSettings {
            image_policy: config.guide.image_policy,
            escape_html: config.guide.escape_html,
            repeat_message_in_history: config.guide.repeat_message_in_history,
            upstream_timeout: config.guide.upstream_timeout,
            generation: config.gemini.generation.clone(),
        };

        Self {
            guide: PlantGuide::new(text_provider, vision_provider, settings),
            config,
        }
    }
}

/// Build the HTTP router for the given state.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/chat-image", post(handlers::chat_image))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(http_trace_layer())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Construct the real providers. A provider whose credentials are not set
/// fails every call with `NotConfigured`.
pub fn build_providers(
    config: &BotanistConfig,
) -> Result<(Arc<dyn TextProvider>, Arc<dyn VisionProvider>), AppError> {
    let timeout = config.guide.upstream_timeout;

    let text_provider: Arc<dyn TextProvider> = match &config.gemini.api_key {
        Some(api_key) => {
            let provider = GeminiTextProvider::new(GeminiConfig {
                api_key: api_key.clone(),
                model: config.gemini.model.clone(),
                api_base: config.gemini.api_base.clone(),
                request_timeout: timeout,
            })
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
            tracing::info!(model = %config.gemini.model, "Initialized Gemini text provider");
            Arc::new(provider)
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set, chat requests will fail");
            Arc::new(UnconfiguredProvider::new("GEMINI_API_KEY"))
        }
    };

    let vision_provider: Arc<dyn VisionProvider> = match &config.vision.credentials {
        Some(credentials) => {
            let provider = CloudVisionProvider::new(VisionConfig {
                credentials: credentials.clone(),
                api_base: config.vision.api_base.clone(),
                request_timeout: timeout,
            })
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
            tracing::info!(api_base = %config.vision.api_base, "Initialized Cloud Vision provider");
            Arc::new(provider)
        }
        None => {
            tracing::warn!("Vision credentials not set, images will not be labeled");
            Arc::new(UnconfiguredProvider::new("GOOGLE_VISION_API_KEY"))
        }
    };

    Ok((text_provider, vision_provider))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with providers derived from the configuration.
    pub async fn build(config: BotanistConfig) -> Result<Self, AppError> {
        let (text_provider, vision_provider) = build_providers(&config)?;
        Self::build_with_providers(config, text_provider, vision_provider).await
    }

    /// Build the application around explicitly supplied providers.
    pub async fn build_with_providers(
        config: BotanistConfig,
        text_provider: Arc<dyn TextProvider>,
        vision_provider: Arc<dyn VisionProvider>,
    ) -> Result<Self, AppError> {
        let port = config.common.port;
        let state = AppState::new(config, text_provider, vision_provider);
        let router = build_router(state);

        // Bind HTTP listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Botanist service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}
