use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::ai::yandex::{self, YandexGptClient};
use crate::attachment::{AttachmentPolicy, DEFAULT_MAX_ATTACHMENT_CHARS};
use crate::tokens::TokenBudget;

pub const API_KEY_ENV: &str = "YANDEX_API_KEY";
pub const FOLDER_ID_ENV: &str = "YANDEX_FOLDER_ID";

fn default_max_attachment_chars() -> usize {
    DEFAULT_MAX_ATTACHMENT_CHARS
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub folder_id: Option<String>,
    /// Overrides `gpt://<folder_id>/yandexgpt-lite`
    pub model_uri: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub token_budget: TokenBudget,
    #[serde(default = "default_max_attachment_chars")]
    pub max_attachment_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_key: None,
            folder_id: None,
            model_uri: None,
            endpoint: None,
            request_timeout_secs: default_timeout_secs(),
            token_budget: TokenBudget::default(),
            max_attachment_chars: default_max_attachment_chars(),
        }
    }

    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config at {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Environment variables win over the config file
    pub fn apply_env(&mut self) {
        self.apply_overrides(std::env::var(API_KEY_ENV).ok(), std::env::var(FOLDER_ID_ENV).ok());
    }

    fn apply_overrides(&mut self, api_key: Option<String>, folder_id: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(folder) = folder_id.filter(|f| !f.is_empty()) {
            self.folder_id = Some(folder);
        }
    }

    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy::with_max_chars(self.max_attachment_chars)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the completion client, failing if credentials are missing
    pub fn completion_client(&self) -> Result<YandexGptClient> {
        let api_key = self.api_key.as_deref()
            .ok_or_else(|| anyhow!("API key not configured. Set {} or add api_key to {}", API_KEY_ENV, Self::display_path()))?;
        let folder_id = self.folder_id.as_deref()
            .ok_or_else(|| anyhow!("Folder id not configured. Set {} or add folder_id to {}", FOLDER_ID_ENV, Self::display_path()))?;

        let mut client = YandexGptClient::new(api_key, folder_id)
            .with_timeout(self.request_timeout())?;
        if let Some(uri) = &self.model_uri {
            client = client.with_model_uri(uri);
        }
        client = client.with_endpoint(self.endpoint.as_deref().unwrap_or(yandex::DEFAULT_ENDPOINT));
        Ok(client)
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("codehelper"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    fn display_path() -> String {
        Self::get_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "config.json".to_string())
    }
}
