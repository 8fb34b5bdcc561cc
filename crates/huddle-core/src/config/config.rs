use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client settings.
///
/// Example `~/.huddle/config.json` (or `.huddle.json` in the working
/// directory, whose keys override the home file):
/// ```json
/// {
///   "api_base_url": "http://localhost:8001/api",
///   "asset_base_url": "http://localhost:8001",
///   "sender_name": "Dana",
///   "stream_idle_timeout_secs": 120
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuddleConfig {
    /// Root of the meeting backend REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Origin that serves uploaded images and company assets.
    #[serde(default = "default_asset_base_url")]
    pub asset_base_url: String,
    /// Name recorded as the author of prompts sent from this client.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    /// Fail a response stream when no chunk arrives for this many seconds.
    /// Unset means wait indefinitely.
    #[serde(default)]
    pub stream_idle_timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base_url() -> String {
    std::env::var("HUDDLE_API_URL").unwrap_or_else(|_| "http://localhost:8001/api".to_string())
}

fn default_asset_base_url() -> String {
    std::env::var("HUDDLE_ASSET_URL").unwrap_or_else(|_| "http://localhost:8001".to_string())
}

fn default_sender_name() -> String {
    std::env::var("HUDDLE_SENDER_NAME").unwrap_or_else(|_| "User".to_string())
}

fn default_user_agent() -> String {
    "huddle/0.1".to_string()
}

impl Default for HuddleConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            asset_base_url: default_asset_base_url(),
            sender_name: default_sender_name(),
            stream_idle_timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl HuddleConfig {
    pub fn load() -> Result<Self> {
        let local = std::env::current_dir()
            .ok()
            .map(|d| d.join(".huddle.json"));
        Self::load_from(&Self::resolve_path("config.json"), local.as_deref())
    }

    /// Read `home` if it exists, then shallow-merge the top-level keys of
    /// `local` over it.
    pub fn load_from(home: &Path, local: Option<&Path>) -> Result<Self> {
        let mut config = if home.exists() {
            let data = std::fs::read_to_string(home)?;
            serde_json::from_str::<HuddleConfig>(&data)?
        } else {
            HuddleConfig::default()
        };

        if let Some(local) = local.filter(|p| p.exists()) {
            let data = std::fs::read_to_string(local)?;
            let override_val: serde_json::Value = serde_json::from_str(&data)?;
            let mut base = serde_json::to_value(&config)?;
            if let (Some(base_obj), Some(over_obj)) =
                (base.as_object_mut(), override_val.as_object())
            {
                for (k, v) in over_obj {
                    base_obj.insert(k.clone(), v.clone());
                }
            }
            config = serde_json::from_value(base)?;
        }

        Ok(config)
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    pub fn resolve_path(relative: &str) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".huddle")
            .join(relative)
    }
}
