//! Configuration management
//!
//! Settings live in `<chronotalk_dir>/settings.json`:
//! ```json
//! {
//!   "assistant": { "model": "gemini-2.5-flash", "timeoutSecs": 30, ... },
//!   "sync": { "pollIntervalMs": 250 }
//! }
//! ```
//! Unknown fields are preserved when saving.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::adapters::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    assistant: AssistantSettings,
    #[serde(default)]
    sync: SyncSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssistantSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    poll_interval_ms: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Generative-text settings
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// ChronoTalk configuration (resolved view of settings + environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub sync_poll_interval: Duration,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
    // Values set through the setters; only these are written back
    changed: Changes,
}

#[derive(Debug, Clone, Default)]
struct Changes {
    model: Option<String>,
    timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant: AssistantConfig::default(),
            sync_poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            _raw_settings: SettingsFile::default(),
            changed: Changes::default(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from the chronotalk directory
    ///
    /// Environment overrides (take precedence over the file):
    /// - CHRONOTALK_API_KEY
    /// - CHRONOTALK_MODEL
    /// - CHRONOTALK_AI_TIMEOUT_SECS
    pub fn load(chronotalk_dir: &Path) -> Result<Self> {
        let settings_path = chronotalk_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let defaults = AssistantConfig::default();

        let api_key = non_empty(std::env::var("CHRONOTALK_API_KEY").ok())
            .or_else(|| non_empty(raw.assistant.api_key.clone()));

        let model = non_empty(std::env::var("CHRONOTALK_MODEL").ok())
            .or_else(|| non_empty(raw.assistant.model.clone()))
            .unwrap_or(defaults.model);

        let endpoint = non_empty(raw.assistant.endpoint.clone()).unwrap_or(defaults.endpoint);

        let timeout_secs = std::env::var("CHRONOTALK_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .or(raw.assistant.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let poll_ms = raw
            .sync
            .poll_interval_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        Ok(Self {
            assistant: AssistantConfig {
                api_key,
                model,
                endpoint,
                timeout: Duration::from_secs(timeout_secs),
            },
            sync_poll_interval: Duration::from_millis(poll_ms),
            _raw_settings: raw,
            changed: Changes::default(),
        })
    }

    /// Save config to the chronotalk directory
    ///
    /// Only values changed through the setters are written. Environment
    /// overrides and defaults stay out of the file.
    pub fn save(&self, chronotalk_dir: &Path) -> Result<()> {
        let settings_path = chronotalk_dir.join("settings.json");

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        if let Some(model) = &self.changed.model {
            settings.assistant.model = Some(model.clone());
        }
        if let Some(secs) = self.changed.timeout_secs {
            settings.assistant.timeout_secs = Some(secs);
        }
        if let Some(ms) = self.changed.poll_interval_ms {
            settings.sync.poll_interval_ms = Some(ms);
        }

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        self.changed.model = Some(model.clone());
        self.assistant.model = model;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.changed.timeout_secs = Some(timeout.as_secs());
        self.assistant.timeout = timeout;
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.changed.poll_interval_ms = Some(interval.as_millis() as u64);
        self.sync_poll_interval = interval;
    }
}
