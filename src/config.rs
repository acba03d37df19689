use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub flows: FlowConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base endpoint every relative path is joined onto, e.g. `http://127.0.0.1:8000/api/`
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    /// Idle time before the session is torn down
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Which flows must collect a 6-digit PIN before submitting.
///
/// Mobile-money withdrawal is always PIN-gated and has no switch here.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PinPolicy {
    pub deposit: bool,
    pub withdraw: bool,
    pub transfer: bool,
}

impl Default for PinPolicy {
    fn default() -> Self {
        Self {
            deposit: false,
            withdraw: true,
            transfer: true,
        }
    }
}

/// Where the target currency of a converted movement comes from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyScope {
    /// Each withdraw/transfer form carries its own selection
    #[default]
    PerFlow,
    /// One selector shared by every form; a form value still overrides it
    Shared,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FlowConfig {
    #[serde(default)]
    pub pin: PinPolicy,
    #[serde(default)]
    pub currency_scope: CurrencyScope,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_resync_delay_secs")]
    pub mobile_money_resync_delay_secs: u64,
}

fn default_currency() -> String {
    "KES".to_string()
}

fn default_resync_delay_secs() -> u64 {
    5
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            pin: PinPolicy::default(),
            currency_scope: CurrencyScope::default(),
            default_currency: default_currency(),
            mobile_money_resync_delay_secs: default_resync_delay_secs(),
        }
    }
}

impl FlowConfig {
    pub fn mobile_money_resync_delay(&self) -> Duration {
        Duration::from_secs(self.mobile_money_resync_delay_secs)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(&format!("config/{}.yaml", env))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}
