use crate::locale::Locale;
use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub inference: InferenceConfig,
    pub chat: ChatDefaults,
    pub storage: StorageConfig,
    pub locale: Locale,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub base_url: String,
    pub max_tokens: u32,
}

/// Values given to every newly created chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDefaults {
    pub model: String,
    pub temperature: f64,
    /// Overrides the locale's default title
    #[serde(default)]
    pub title: Option<String>,
    /// Overrides the locale's greeting
    #[serde(default)]
    pub greeting: Option<String>,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: "qwen-plus".to_string(),
            temperature: 0.7,
            title: None,
            greeting: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Filesystem,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

const API_KEY_VARS: [&str; 3] = ["PARLEY_API_KEY", "DASHSCOPE_API_KEY", "OPENAI_API_KEY"];

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .set_default(
                "inference.base_url",
                "https://dashscope.aliyuncs.com/compatible-mode/v1",
            )?
            .set_default("inference.max_tokens", 2048)?
            .set_default("chat.model", "qwen-plus")?
            .set_default("chat.temperature", 0.7)?
            .set_default("storage.backend", "sqlite")?
            .set_default("storage.path", "./parley-data")?
            .set_default("locale", "zh-CN")?
            .set_default("logging.level", "info")?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn api_key() -> Result<String> {
        API_KEY_VARS
            .iter()
            .find_map(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No API key found; set one of {}",
                    API_KEY_VARS.join(", ")
                )
            })
    }
}
