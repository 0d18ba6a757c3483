use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Full daemon configuration, loaded from a TOML file with env overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub memory: MemoryServiceConfig,
    pub chat: ChatBusConfig,
    pub callback: CallbackConfig,
    pub assistant: AssistantConfig,
    pub engine: EngineConfig,
}

/// External memory service holding the per-task status records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryServiceConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for MemoryServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8283".to_string(),
            token: None,
        }
    }
}

/// Chat-room bus used as the primary notification channel. When `base_url`
/// is unset the channel reports itself as not configured and the router
/// goes straight to the fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatBusConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

/// Fallback notification channel: plain HTTP POST to a per-agent endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Explicit path to the assistant binary. Overrides the search order.
    pub binary: Option<String>,
    /// Binary name used for the `~/.local/bin` and PATH lookups.
    pub binary_name: String,
    /// Mode flags passed before the prompt.
    pub flags: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            binary: None,
            binary_name: "claude".to_string(),
            flags: vec!["-p".to_string(), "--output-format".to_string(), "text".to_string()],
            timeout_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Non-elevated status records kept per agent after a task completes.
    pub keep_records: usize,
    /// Default checkpoint continuation budget.
    pub max_iterations: u32,
    pub registry_ttl_secs: u64,
    pub registry_sweep_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keep_records: 3,
            max_iterations: 5,
            registry_ttl_secs: 3600,
            registry_sweep_secs: 300,
        }
    }
}

impl BridgeConfig {
    /// Load config from `path` (or the default location), then apply
    /// `TASKBRIDGE_*` env overrides. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            let parsed: BridgeConfig = toml::from_str(&raw)
                .with_context(|| format!("invalid config at {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            parsed
        } else {
            BridgeConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TASKBRIDGE_MEMORY_URL") {
            self.memory.base_url = v;
        }
        if let Ok(v) = std::env::var("TASKBRIDGE_MEMORY_TOKEN") {
            self.memory.token = Some(v);
        }
        if let Ok(v) = std::env::var("TASKBRIDGE_CHAT_URL") {
            self.chat.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("TASKBRIDGE_CHAT_TOKEN") {
            self.chat.token = Some(v);
        }
        if let Ok(v) = std::env::var("TASKBRIDGE_CALLBACK_URL") {
            self.callback.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("TASKBRIDGE_ASSISTANT_BIN") {
            self.assistant.binary = Some(v);
        }
        if let Ok(v) = std::env::var("TASKBRIDGE_ASSISTANT_TIMEOUT_SECS")
            && let Ok(secs) = v.parse()
        {
            self.assistant.timeout_secs = secs;
        }
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.memory.base_url)
            .with_context(|| format!("memory.base_url is not a URL: {}", self.memory.base_url))?;
        for candidate in [&self.chat.base_url, &self.callback.base_url] {
            if let Some(u) = candidate {
                url::Url::parse(u).with_context(|| format!("not a URL: {}", u))?;
            }
        }
        Ok(())
    }

    pub fn assistant_timeout(&self) -> Duration {
        Duration::from_secs(self.assistant.timeout_secs)
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskbridge")
        .join("config.toml")
}
