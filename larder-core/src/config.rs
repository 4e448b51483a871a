//! Configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default generative-model API base URL.
pub const DEFAULT_MODEL_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";

/// Default label-detection API base URL.
pub const DEFAULT_VISION_BASE_URL: &str = "https://vision.googleapis.com/v1";

/// Default bound on one outbound model or label call.
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 8_000;

/// Default bound on one conversion-store call.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 3_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Which generative-model provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Fake,
}

/// Where learned conversion factors live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    Disk(PathBuf),
}

/// Generative-model client configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    /// Required for [`ProviderKind::Gemini`].
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Label-detection client configuration. `None` api key disables classification.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct LarderConfig {
    pub model: ModelConfig,
    pub vision: VisionConfig,
    pub conversion_store: StoreLocation,
    pub store_timeout: Duration,
    /// Directory for archived baked-product recipes; `None` disables archiving.
    pub recipe_archive_dir: Option<PathBuf>,
}

impl LarderConfig {
    /// Load configuration from environment variables.
    ///
    /// - `LARDER_PROVIDER`: "gemini" (default) or "fake"
    /// - `GEMINI_API_KEY`: required for the gemini provider
    /// - `LARDER_MODEL`: model name (default: "gemini-2.0-flash")
    /// - `LARDER_MODEL_BASE_URL`: model API base URL
    /// - `VISION_API_KEY`: label detection key (classification disabled if unset)
    /// - `LARDER_VISION_BASE_URL`: label detection API base URL
    /// - `LARDER_UPSTREAM_TIMEOUT_MS`: outbound call bound (default: 8000)
    /// - `LARDER_STORE_TIMEOUT_MS`: store call bound (default: 3000)
    /// - `LARDER_CONVERSION_STORE`: "memory", "disk" (default) or a directory path
    /// - `LARDER_RECIPE_ARCHIVE`: "none", "disk" (default) or a directory path
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match env::var("LARDER_PROVIDER").as_deref() {
            Err(_) | Ok("gemini") => ProviderKind::Gemini,
            Ok("fake") => ProviderKind::Fake,
            Ok(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "LARDER_PROVIDER".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        if provider == ProviderKind::Gemini && api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()));
        }

        let upstream_timeout = duration_ms_var(
            "LARDER_UPSTREAM_TIMEOUT_MS",
            DEFAULT_UPSTREAM_TIMEOUT_MS,
        )?;

        let model = ModelConfig {
            provider,
            api_key,
            model: env::var("LARDER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: env::var("LARDER_MODEL_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_MODEL_BASE_URL.to_string()),
            timeout: upstream_timeout,
        };

        let vision = VisionConfig {
            api_key: env::var("VISION_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env::var("LARDER_VISION_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_VISION_BASE_URL.to_string()),
            timeout: upstream_timeout,
        };

        let conversion_store = match env::var("LARDER_CONVERSION_STORE").ok() {
            Some(val) if val == "memory" => StoreLocation::Memory,
            Some(val) if val == "disk" => StoreLocation::Disk(Self::default_conversion_dir()),
            Some(path) => StoreLocation::Disk(PathBuf::from(path)),
            None => StoreLocation::Disk(Self::default_conversion_dir()),
        };

        let recipe_archive_dir = match env::var("LARDER_RECIPE_ARCHIVE").ok() {
            Some(val) if val == "none" => None,
            Some(val) if val == "disk" => Some(Self::default_archive_dir()),
            Some(path) => Some(PathBuf::from(path)),
            None => Some(Self::default_archive_dir()),
        };

        Ok(Self {
            model,
            vision,
            conversion_store,
            store_timeout: duration_ms_var("LARDER_STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS)?,
            recipe_archive_dir,
        })
    }

    /// Default conversion store directory: ~/.larder/conversions
    pub fn default_conversion_dir() -> PathBuf {
        Self::data_dir().join("conversions")
    }

    /// Default recipe archive directory: ~/.larder/recipes
    pub fn default_archive_dir() -> PathBuf {
        Self::data_dir().join("recipes")
    }

    fn data_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".larder"))
            .unwrap_or_else(|| PathBuf::from("data"))
    }
}

fn duration_ms_var(name: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(Duration::from_millis(default_ms)),
        Ok(value) => value
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .ok_or(ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            }),
    }
}
