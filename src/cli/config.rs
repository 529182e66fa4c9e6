//! Configuration management for bedrock-chat
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.bedrock-chat/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{ChatError, Result};
use crate::models::ModelId;
use crate::rag::pipeline::ChatSettings;

/// Environment variable overriding the knowledge-base id
pub const KB_ID_ENV: &str = "BEDROCK_KB_ID";

/// Environment variable overriding the region
pub const REGION_ENV: &str = "AWS_REGION";

/// Complete configuration for bedrock-chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bedrock: BedrockConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Bedrock connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockConfig {
    pub region: String,
    /// Empty means derived from `region`
    pub runtime_endpoint: String,
    /// Empty means derived from `region`
    pub agent_runtime_endpoint: String,
    /// Name of the environment variable holding the Bedrock API key
    pub api_key_env: String,
    /// Sign requests with SigV4 using the default AWS credential chain
    pub use_aws_credentials: bool,
    /// 0 leaves requests without a timeout
    pub request_timeout_secs: u64,
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub model: ModelId,
    pub knowledge_base_id: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: usize,
    pub show_context: bool,
    /// Keep the generated answer even when no passage had any text
    pub answer_without_context: bool,
}

/// File system paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub state_dir: String,
    pub log_dir: String,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            runtime_endpoint: String::new(),
            agent_runtime_endpoint: String::new(),
            api_key_env: "AWS_BEARER_TOKEN_BEDROCK".to_string(),
            use_aws_credentials: true,
            request_timeout_secs: 0,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            knowledge_base_id: String::new(),
            temperature: 1.0,
            top_p: 1.0,
            top_k: 3,
            show_context: false,
            answer_without_context: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: "~/.bedrock-chat".to_string(),
            log_dir: "~/.bedrock-chat/logs".to_string(),
        }
    }
}

impl BedrockConfig {
    /// bedrock-runtime base URL
    pub fn runtime_url(&self) -> String {
        if self.runtime_endpoint.trim().is_empty() {
            format!("https://bedrock-runtime.{}.amazonaws.com", self.region)
        } else {
            self.runtime_endpoint.clone()
        }
    }

    /// bedrock-agent-runtime base URL
    pub fn agent_runtime_url(&self) -> String {
        if self.agent_runtime_endpoint.trim().is_empty() {
            format!("https://bedrock-agent-runtime.{}.amazonaws.com", self.region)
        } else {
            self.agent_runtime_endpoint.clone()
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    ///
    /// Values are not range-checked here; environment and CLI overrides are
    /// applied first, then `validate` runs on the merged result.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatError::ConfigError(format!("Failed to read config: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| ChatError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".bedrock-chat").join("config.toml"))
    }

    /// Apply `BEDROCK_KB_ID` and `AWS_REGION` on top of the file values
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(KB_ID_ENV).ok(),
            std::env::var(REGION_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, kb_id: Option<String>, region: Option<String>) {
        if let Some(kb_id) = kb_id.filter(|v| !v.trim().is_empty()) {
            self.chat.knowledge_base_id = kb_id.trim().to_string();
        }
        if let Some(region) = region.filter(|v| !v.trim().is_empty()) {
            self.bedrock.region = region.trim().to_string();
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.bedrock.region.trim().is_empty() {
            return Err(ChatError::ConfigError("region must not be empty".to_string()));
        }

        if self.bedrock.api_key_env.trim().is_empty() {
            return Err(ChatError::ConfigError(
                "api_key_env must name an environment variable".to_string(),
            ));
        }

        self.chat_settings().validate()
    }

    /// Validate what starting a chat additionally needs
    pub fn validate_for_chat(&self) -> Result<()> {
        self.validate()?;
        if self.chat.knowledge_base_id.trim().is_empty() {
            return Err(ChatError::ConfigError(format!(
                "knowledge base id is required (set [chat].knowledge_base_id, {} or --kb-id)",
                KB_ID_ENV
            )));
        }
        Ok(())
    }

    /// Per-turn settings derived from the `[chat]` table
    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            model: self.chat.model,
            knowledge_base_id: self.chat.knowledge_base_id.clone(),
            temperature: self.chat.temperature,
            top_p: self.chat.top_p,
            top_k: self.chat.top_k,
            show_context: self.chat.show_context,
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ChatError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChatError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ChatError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get state directory path
    pub fn state_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.state_dir)
    }

    /// Get log directory path
    pub fn log_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.log_dir)
    }

    /// REPL input history file
    pub fn history_path(&self) -> PathBuf {
        self.state_dir().join("history")
    }
}
