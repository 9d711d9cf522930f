use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::features::AgePolicy;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub models: ModelsConfig,
    #[serde(default)]
    pub vectorizer: VectorizerConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Multi-class disease bundle artifact
    pub disease_path: PathBuf,
    /// Binary outcome-risk bundle artifact
    pub outcome_path: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            disease_path: PathBuf::from("models/disease_model.json"),
            outcome_path: PathBuf::from("models/outcome_model.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VectorizerConfig {
    /// How an unparsable age is handled (lenient = default to 0, strict = reject)
    #[serde(default)]
    pub age_policy: AgePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    /// Number of ranked diseases returned
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig::default(),
            vectorizer: VectorizerConfig::default(),
            prediction: PredictionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("models.disease_path", "models/disease_model.json")?
            .set_default("models.outcome_path", "models/outcome_model.json")?
            .set_default("vectorizer.age_policy", "lenient")?
            .set_default("prediction.top_k", 3)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("CLINIC_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (CLINIC_MODELS__DISEASE_PATH, etc.)
            .add_source(
                Environment::with_prefix("CLINIC")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.prediction.top_k == 0 {
            errors.push("prediction.top_k must be at least 1".to_string());
        }

        if self.models.disease_path.as_os_str().is_empty() {
            errors.push("models.disease_path must not be empty".to_string());
        }

        if self.models.outcome_path.as_os_str().is_empty() {
            errors.push("models.outcome_path must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
