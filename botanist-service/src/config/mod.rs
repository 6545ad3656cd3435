use crate::services::image::ImagePolicy;
use crate::services::providers::gemini::GEMINI_API_BASE;
use crate::services::providers::vision::{VisionCredentials, VISION_API_BASE};
use crate::services::providers::GenerationParams;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// JSON bodies carry whole photos as data URIs.
const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct BotanistConfig {
    pub common: core_config::Config,
    pub environment: String,
    pub gemini: GeminiSettings,
    pub vision: VisionSettings,
    pub guide: GuideOptions,
    pub server: ServerSettings,
    /// OTLP collector endpoint. Spans are only exported when set.
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// `None` outside production falls back to the mock provider.
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
    pub generation: GenerationParams,
}

#[derive(Debug, Clone)]
pub struct VisionSettings {
    /// `None` outside production falls back to the mock provider.
    pub credentials: Option<VisionCredentials>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct GuideOptions {
    pub image_policy: ImagePolicy,
    pub escape_html: bool,
    pub repeat_message_in_history: bool,
    pub upstream_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub static_dir: PathBuf,
    pub body_limit_bytes: usize,
}

impl BotanistConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the service settings from `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource {
            lookup: &lookup,
            is_prod: lookup("ENVIRONMENT").as_deref() == Some("prod"),
        };

        Ok(BotanistConfig {
            common,
            environment: env.get("ENVIRONMENT", Some("dev"))?,
            gemini: GeminiSettings {
                api_key: env.optional("GEMINI_API_KEY")?.map(Secret::new),
                model: env.get("GEMINI_MODEL", Some("gemini-1.5-flash"))?,
                api_base: env.get("GEMINI_API_BASE", Some(GEMINI_API_BASE))?,
                generation: GenerationParams {
                    temperature: Some(env.parse("GEMINI_TEMPERATURE", 1.0)?),
                    top_p: Some(env.parse("GEMINI_TOP_P", 0.95)?),
                    top_k: Some(env.parse("GEMINI_TOP_K", 40)?),
                    max_tokens: Some(env.parse("GEMINI_MAX_OUTPUT_TOKENS", 8192)?),
                    response_mime_type: Some(
                        env.get("GEMINI_RESPONSE_MIME_TYPE", Some("text/plain"))?,
                    ),
                },
            },
            vision: VisionSettings {
                credentials: vision_credentials(&env)?,
                api_base: env.get("VISION_API_BASE", Some(VISION_API_BASE))?,
            },
            guide: GuideOptions {
                image_policy: env.parse("IMAGE_POLICY", ImagePolicy::AnyImageMime)?,
                escape_html: env.parse("ESCAPE_HTML", false)?,
                repeat_message_in_history: env.parse("REPEAT_MESSAGE_IN_HISTORY", true)?,
                upstream_timeout: Duration::from_secs(
                    env.parse("UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS)?,
                ),
            },
            server: ServerSettings {
                static_dir: PathBuf::from(env.get("STATIC_DIR", Some("botanist-service/public"))?),
                body_limit_bytes: env.parse("BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT_BYTES)?,
            },
            otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }

    pub fn is_prod(&self) -> bool {
        self.environment == "prod"
    }
}

/// `GOOGLE_VISION_API_KEY` names a service-account key file, with
/// `GOOGLE_APPLICATION_CREDENTIALS` as the conventional fallback. A plain
/// API key may be given in `GOOGLE_VISION_KEY` instead.
fn vision_credentials<F>(env: &EnvSource<'_, F>) -> Result<Option<VisionCredentials>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let key_file = (env.lookup)("GOOGLE_VISION_API_KEY")
        .or_else(|| (env.lookup)("GOOGLE_APPLICATION_CREDENTIALS"))
        .filter(|v| !v.is_empty());
    if let Some(path) = key_file {
        return Ok(Some(VisionCredentials::KeyFile(PathBuf::from(path))));
    }

    if let Some(key) = (env.lookup)("GOOGLE_VISION_KEY").filter(|v| !v.is_empty()) {
        return Ok(Some(VisionCredentials::ApiKey(Secret::new(key))));
    }

    if env.is_prod {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "GOOGLE_VISION_API_KEY or GOOGLE_VISION_KEY is required in production but not set"
        )));
    }

    Ok(None)
}

struct EnvSource<'a, F> {
    lookup: &'a F,
    is_prod: bool,
}

impl<F> EnvSource<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str, default: Option<&str>) -> Result<String, AppError> {
        match (self.lookup)(key) {
            Some(val) => Ok(val),
            None => match default {
                Some(def) => Ok(def.to_string()),
                None => Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                ))),
            },
        }
    }

    /// Credentials: optional in development, required in production.
    fn optional(&self, key: &str) -> Result<Option<String>, AppError> {
        match (self.lookup)(key).filter(|v| !v.is_empty()) {
            Some(val) => Ok(Some(val)),
            None if self.is_prod => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required in production but not set",
                key
            ))),
            None => Ok(None),
        }
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.lookup)(key) {
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
                AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
            }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn common() -> core_config::Config {
        core_config::Config {
            port: 0,
            log_level: "info".to_string(),
        }
    }

    fn load(vars: &[(&str, &str)]) -> Result<BotanistConfig, AppError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotanistConfig::from_lookup(common(), |key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_original_generation_settings() {
        let config = load(&[("GEMINI_API_KEY", "k")]).unwrap();

        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.generation.temperature, Some(1.0));
        assert_eq!(config.gemini.generation.top_p, Some(0.95));
        assert_eq!(config.gemini.generation.top_k, Some(40));
        assert_eq!(config.gemini.generation.max_tokens, Some(8192));
        assert_eq!(
            config.gemini.generation.response_mime_type.as_deref(),
            Some("text/plain")
        );
        assert_eq!(config.guide.image_policy, ImagePolicy::AnyImageMime);
        assert!(!config.guide.escape_html);
        assert!(config.guide.repeat_message_in_history);
        assert_eq!(config.server.body_limit_bytes, 10 * 1024 * 1024);
        assert_eq!(config.otlp_endpoint, None);
    }

    #[test]
    fn dev_allows_missing_credentials() {
        let config = load(&[]).unwrap();
        assert!(config.gemini.api_key.is_none());
        assert!(config.vision.credentials.is_none());
    }

    #[test]
    fn prod_requires_gemini_key() {
        let result = load(&[("ENVIRONMENT", "prod"), ("GOOGLE_VISION_KEY", "v")]);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn prod_requires_vision_credentials() {
        let result = load(&[("ENVIRONMENT", "prod"), ("GEMINI_API_KEY", "k")]);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn key_file_takes_precedence_over_api_key() {
        let config = load(&[
            ("GOOGLE_VISION_API_KEY", "/secrets/vision.json"),
            ("GOOGLE_VISION_KEY", "plain"),
        ])
        .unwrap();

        match config.vision.credentials {
            Some(VisionCredentials::KeyFile(path)) => {
                assert_eq!(path, PathBuf::from("/secrets/vision.json"))
            }
            other => panic!("unexpected credentials: {:?}", other),
        }
    }

    #[test]
    fn plain_vision_key_is_secret() {
        let config = load(&[("GOOGLE_VISION_KEY", "plain")]).unwrap();
        match config.vision.credentials {
            Some(VisionCredentials::ApiKey(key)) => assert_eq!(key.expose_secret(), "plain"),
            other => panic!("unexpected credentials: {:?}", other),
        }
    }

    #[test]
    fn parses_flags_and_policy() {
        let config = load(&[
            ("IMAGE_POLICY", "jpeg-only"),
            ("ESCAPE_HTML", "true"),
            ("REPEAT_MESSAGE_IN_HISTORY", "false"),
            ("UPSTREAM_TIMEOUT_SECS", "15"),
        ])
        .unwrap();

        assert_eq!(config.guide.image_policy, ImagePolicy::JpegOnly);
        assert!(config.guide.escape_html);
        assert!(!config.guide.repeat_message_in_history);
        assert_eq!(config.guide.upstream_timeout, Duration::from_secs(15));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            load(&[("IMAGE_POLICY", "gif-only")]),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            load(&[("GEMINI_TOP_K", "many")]),
            Err(AppError::ConfigError(_))
        ));
    }
}
