//! Google Cloud Vision label detection.
//!
//! Authenticates either with a plain API key or with a service-account key
//! file (OAuth2 JWT bearer grant). Access tokens are cached until shortly
//! before they expire.

use super::{ProviderError, VisionProvider};
use crate::models::Label;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cloud Vision API base URL.
pub const VISION_API_BASE: &str = "https://vision.googleapis.com/v1";

const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Assertion lifetime accepted by Google's token endpoint.
const ASSERTION_TTL_SECS: i64 = 3600;

/// Refresh tokens this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Labels requested per image. Only the first few are used downstream.
const MAX_RESULTS: u32 = 10;

/// How the vision client authenticates.
#[derive(Debug, Clone)]
pub enum VisionCredentials {
    /// Plain API key sent in the `x-goog-api-key` header.
    ApiKey(Secret<String>),
    /// Path to a service-account JSON key file.
    KeyFile(PathBuf),
}

/// Cloud Vision provider configuration.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub credentials: VisionCredentials,
    pub api_base: String,
    pub request_timeout: Duration,
}

/// The subset of a service-account key file needed for the JWT grant.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: Secret<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, ProviderError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::NotConfigured(format!(
                "Cannot read service account key {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            ProviderError::NotConfigured(format!(
                "Invalid service account key {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))
}

enum VisionAuth {
    ApiKey(Secret<String>),
    ServiceAccount {
        key: ServiceAccountKey,
        encoding_key: EncodingKey,
        token: RwLock<Option<CachedToken>>,
    },
}

/// Cloud Vision label-detection provider.
pub struct CloudVisionProvider {
    api_base: String,
    client: Client,
    auth: VisionAuth,
}

impl CloudVisionProvider {
    pub fn new(config: VisionConfig) -> Result<Self, ProviderError> {
        let client = http_client(config.request_timeout)?;

        let auth = match config.credentials {
            VisionCredentials::ApiKey(key) => VisionAuth::ApiKey(key),
            VisionCredentials::KeyFile(path) => {
                let key = ServiceAccountKey::from_file(&path)?;
                Self::service_account_auth(key)?
            }
        };

        Ok(Self {
            api_base: config.api_base,
            client,
            auth,
        })
    }

    /// Build a provider from an already parsed service-account key.
    pub fn with_service_account(
        key: ServiceAccountKey,
        api_base: String,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_base,
            client: http_client(request_timeout)?,
            auth: Self::service_account_auth(key)?,
        })
    }

    fn service_account_auth(key: ServiceAccountKey) -> Result<VisionAuth, ProviderError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())
            .map_err(|e| ProviderError::Auth(format!("Invalid service account private key: {}", e)))?;

        Ok(VisionAuth::ServiceAccount {
            key,
            encoding_key,
            token: RwLock::new(None),
        })
    }

    fn annotate_url(&self) -> String {
        format!("{}/images:annotate", self.api_base.trim_end_matches('/'))
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ProviderError> {
        match &self.auth {
            VisionAuth::ApiKey(key) => Ok(request.header(API_KEY_HEADER, key.expose_secret())),
            VisionAuth::ServiceAccount {
                key,
                encoding_key,
                token,
            } => {
                let access_token = self.access_token(key, encoding_key, token).await?;
                Ok(request.bearer_auth(access_token))
            }
        }
    }

    async fn access_token(
        &self,
        key: &ServiceAccountKey,
        encoding_key: &EncodingKey,
        cache: &RwLock<Option<CachedToken>>,
    ) -> Result<String, ProviderError> {
        {
            let cached = cache.read().await;
            if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
                return Ok(token.value.clone());
            }
        }

        let mut guard = cache.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = guard.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.clone());
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: VISION_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, encoding_key)
            .map_err(|e| ProviderError::Auth(format!("Failed to sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(format!(
                "Token exchange failed {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Auth(format!("Failed to parse token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        tracing::debug!(
            client_email = %key.client_email,
            expires_in = token.expires_in,
            "Obtained Cloud Vision access token"
        );

        Ok(token.access_token)
    }
}

#[async_trait]
impl VisionProvider for CloudVisionProvider {
    async fn detect_labels(&self, image_base64: &str) -> Result<Vec<Label>, ProviderError> {
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageSource {
                    content: image_base64,
                },
                features: vec![Feature {
                    kind: "LABEL_DETECTION",
                    max_results: MAX_RESULTS,
                }],
            }],
        };

        tracing::debug!(image_len = image_base64.len(), "Sending label detection request");

        let builder = self.client.post(self.annotate_url()).json(&request);
        let response = self
            .authorize(builder)
            .await?
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Vision API error {}: {}",
                status, error_text
            )));
        }

        let api_response: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        let result = api_response
            .responses
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        if let Some(status) = result.error {
            return Err(ProviderError::ApiError(format!(
                "Vision API image error {}: {}",
                status.code, status.message
            )));
        }

        Ok(result.label_annotations)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.auth {
            VisionAuth::ApiKey(key) if key.expose_secret().is_empty() => Err(
                ProviderError::NotConfigured("Vision API key not configured".to_string()),
            ),
            VisionAuth::ApiKey(_) => Ok(()),
            VisionAuth::ServiceAccount {
                key,
                encoding_key,
                token,
            } => self
                .access_token(key, encoding_key, token)
                .await
                .map(|_| ()),
        }
    }
}

// ============================================================================
// Cloud Vision API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageSource<'a>,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    label_annotations: Vec<Label>,
    #[serde(default)]
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}
