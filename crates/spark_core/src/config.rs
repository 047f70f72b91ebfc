//! Client configuration - file plus environment loading and validated
//! sampling-parameter setters.

use std::collections::HashMap;
use std::path::Path;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::language::LanguageProfile;

const CONFIG_FILE_PATH: &str = "config.toml";

/// Static service credentials, immutable for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
}

fn default_uid() -> String {
    "1234".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_top_k() -> u32 {
    4
}

fn default_max_tokens() -> u32 {
    2048
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparkConfig {
    pub credentials: Credentials,
    /// Full wss:// endpoint of the chat service.
    pub spark_url: String,
    /// Model domain, e.g. "generalv2". Required by the service.
    pub domain: String,
    #[serde(default = "default_uid")]
    pub uid: String,
    /// Sampling randomness, valid range [0, 1].
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Candidate pool size, valid range [1, 6].
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Answer length cap in tokens, valid range [1, 4096].
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Service error code -> human readable message.
    #[serde(default)]
    pub error_code_table: HashMap<String, String>,
    /// Optional prefix prepended to the first stored turn of a session.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub language: LanguageProfile,
}

impl Default for SparkConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            spark_url: String::new(),
            domain: String::new(),
            uid: default_uid(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            max_tokens: default_max_tokens(),
            error_code_table: HashMap::new(),
            prompt: None,
            language: LanguageProfile::default(),
        }
    }
}

impl SparkConfig {
    /// Load from `config.toml` in the working directory, then let
    /// environment variables override individual values.
    pub fn load() -> Self {
        let mut config = Self::from_file(Path::new(CONFIG_FILE_PATH)).unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    fn from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<SparkConfig>(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                error!("Failed to parse {}: {e}", path.display());
                None
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(app_id) = std::env::var("SPARK_APP_ID") {
            self.credentials.app_id = app_id;
        }
        if let Ok(api_key) = std::env::var("SPARK_API_KEY") {
            self.credentials.api_key = api_key;
        }
        if let Ok(api_secret) = std::env::var("SPARK_API_SECRET") {
            self.credentials.api_secret = api_secret;
        }
        if let Ok(url) = std::env::var("SPARK_URL") {
            self.spark_url = url;
        }
        if let Ok(domain) = std::env::var("SPARK_DOMAIN") {
            self.domain = domain;
        }
    }

    /// Set `max_tokens`, rejecting values outside [1, 4096]. Returns the
    /// value actually in effect afterwards.
    pub fn set_max_tokens(&mut self, value: u32) -> u32 {
        info!("Resetting max_tokens, requested value: {value}");
        if (1..=4096).contains(&value) {
            self.max_tokens = value;
        } else {
            error!("max_tokens value {value} out of range [1, 4096], keeping {}", self.max_tokens);
        }
        self.max_tokens
    }

    /// Set `top_k`, rejecting values outside [1, 6].
    pub fn set_top_k(&mut self, value: u32) -> u32 {
        info!("Resetting top_k, requested value: {value}");
        if (1..=6).contains(&value) {
            self.top_k = value;
        } else {
            error!("top_k value {value} out of range [1, 6], keeping {}", self.top_k);
        }
        self.top_k
    }

    /// Set `temperature`, rejecting values outside [0, 1].
    pub fn set_temperature(&mut self, value: f32) -> f32 {
        info!("Resetting temperature, requested value: {value}");
        if (0.0..=1.0).contains(&value) {
            self.temperature = value;
        } else {
            error!("temperature value {value} out of range [0, 1], keeping {}", self.temperature);
        }
        self.temperature
    }

    pub fn set_language(&mut self, language: LanguageProfile) {
        self.language = language;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_toml() -> &'static str {
        r#"
            spark_url = "wss://spark-api.xf-yun.com/v2.1/chat"
            domain = "generalv2"

            [credentials]
            app_id = "app"
            api_key = "key"
            api_secret = "secret"
        "#
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: SparkConfig = toml::from_str(base_toml()).unwrap();
        assert_eq!(config.credentials.app_id, "app");
        assert_eq!(config.uid, "1234");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.language, LanguageProfile::Mixed);
        assert!(config.error_code_table.is_empty());
        assert!(config.prompt.is_none());
    }

    #[test]
    fn parses_error_code_table() {
        let toml_str = format!(
            "{}\n[error_code_table]\n10163 = \"param error\"\n",
            base_toml()
        );
        let config: SparkConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            config.error_code_table.get("10163").map(String::as_str),
            Some("param error")
        );
    }

    #[test]
    fn file_values_are_overridden_by_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, base_toml()).unwrap();

        let mut config = SparkConfig::from_file(&path).unwrap();
        assert_eq!(config.credentials.app_id, "app");
        assert_eq!(config.domain, "generalv2");

        let vars = [
            ("SPARK_APP_ID", "env-app"),
            ("SPARK_API_KEY", "env-key"),
            ("SPARK_API_SECRET", "env-secret"),
            ("SPARK_URL", "wss://env.example.com/chat"),
            ("SPARK_DOMAIN", "generalv3"),
        ];
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
        config.apply_env_overrides();
        for (name, _) in vars {
            std::env::remove_var(name);
        }

        assert_eq!(config.credentials.app_id, "env-app");
        assert_eq!(config.credentials.api_key, "env-key");
        assert_eq!(config.credentials.api_secret, "env-secret");
        assert_eq!(config.spark_url, "wss://env.example.com/chat");
        assert_eq!(config.domain, "generalv3");
        // Values without an environment override keep the file values.
        assert_eq!(config.uid, "1234");
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SparkConfig::from_file(&dir.path().join("config.toml")).is_none());
    }

    #[test]
    fn setters_reject_out_of_range() {
        let mut config = SparkConfig::default();

        assert_eq!(config.set_max_tokens(4096), 4096);
        assert_eq!(config.set_max_tokens(5000), 4096);
        assert_eq!(config.set_max_tokens(0), 4096);

        assert_eq!(config.set_top_k(6), 6);
        assert_eq!(config.set_top_k(7), 6);

        assert_eq!(config.set_temperature(0.9), 0.9);
        assert_eq!(config.set_temperature(1.5), 0.9);
        assert_eq!(config.set_temperature(-0.1), 0.9);
    }
}
