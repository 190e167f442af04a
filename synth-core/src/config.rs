use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const CONFIG_PATH_VAR: &str = "WSB_SYNTH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "synthesizer.toml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://wsb_synthesizer.sqlite";
pub const DEFAULT_USER_AGENT: &str = "wsb-synthesizer/0.1";

const LISTING_CATEGORIES: [&str; 4] = ["new", "hot", "top", "rising"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub subreddit: String,
    pub category: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            subreddit: "wallstreetbets".to_string(),
            category: "top".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    pub api_key: String,
}

/// Credentials and settings, loaded once at startup and passed to each
/// component's constructor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub reddit: RedditConfig,
    pub market_data: MarketDataConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            reddit: RedditConfig::default(),
            market_data: MarketDataConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads `path` if it exists. A missing file yields the defaults so the
    /// environment alone can supply credentials.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `.env`, the config file, environment overrides, then validates.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(&std::env::vars().collect());
        config.validate()?;

        info!(
            "Configuration loaded: r/{} ({}), database {}",
            config.reddit.subreddit, config.reddit.category, config.database_url
        );
        Ok(config)
    }

    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) {
        let targets: [(&str, &mut String); 5] = [
            ("REDDIT_CLIENT_ID", &mut self.reddit.client_id),
            ("REDDIT_CLIENT_SECRET", &mut self.reddit.client_secret),
            ("REDDIT_USER_AGENT", &mut self.reddit.user_agent),
            ("ALPHAVANTAGE_API_KEY", &mut self.market_data.api_key),
            ("WSB_SYNTH_DATABASE_URL", &mut self.database_url),
        ];
        for (name, target) in targets {
            if let Some(value) = vars.get(name).filter(|v| !v.trim().is_empty()) {
                *target = value.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("reddit.client_id", &self.reddit.client_id),
            ("reddit.client_secret", &self.reddit.client_secret),
            ("reddit.user_agent", &self.reddit.user_agent),
            ("market_data.api_key", &self.market_data.api_key),
            ("database_url", &self.database_url),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        if !LISTING_CATEGORIES.contains(&self.reddit.category.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "reddit.category".to_string(),
                value: self.reddit.category.clone(),
            });
        }
        Ok(())
    }
}
