use eyre::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::enforcement::Enforcement;
use crate::error::ConfigError;

const CONFIG_FILE: &str = "contextgraph.yaml";

/// Main ContextGraph configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// API key (falls back to CG_API_KEY)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Agent id for LangChain adapters (falls back to CG_AGENT_ID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Crew id for the CrewAI observer (falls back to CG_CREW_ID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crew_id: Option<String>,
    /// API base URL (falls back to CG_API_URL, then the adapter default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    pub timeout_secs: u64,
    /// Approve every decision right after logging it (testing only)
    pub auto_approve: bool,
    pub log_level: LogLevel,
    /// Static metadata merged into every decision
    pub metadata: IndexMap<String, Value>,
    pub langchain: LangChainConfig,
    pub crewai: CrewAiConfig,
    pub enforcement: EnforcementConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LangChainConfig {
    /// Callback handler: log individual LLM calls
    pub log_llm_calls: bool,
    /// Callback handler: log chain executions
    pub log_chain_calls: bool,
    /// Middleware: log model calls
    pub log_model_calls: bool,
    /// Middleware: log tool calls
    pub log_tool_calls: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrewAiConfig {
    pub log_tool_calls: bool,
    pub log_agent_thoughts: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnforcementConfig {
    /// Block actions the service denies or holds for approval
    pub enabled: bool,
    /// Block when the service is unreachable
    pub fail_closed: bool,
    pub poll_interval_ms: u64,
    pub approval_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            agent_id: None,
            crew_id: None,
            api_url: None,
            timeout_secs: 30,
            auto_approve: false,
            log_level: LogLevel::Info,
            metadata: IndexMap::new(),
            langchain: LangChainConfig::default(),
            crewai: CrewAiConfig::default(),
            enforcement: EnforcementConfig::default(),
        }
    }
}

impl Default for LangChainConfig {
    fn default() -> Self {
        Self {
            log_llm_calls: false,
            log_chain_calls: true,
            log_model_calls: true,
            log_tool_calls: true,
        }
    }
}

impl Default for CrewAiConfig {
    fn default() -> Self {
        Self {
            log_tool_calls: true,
            log_agent_thoughts: true,
        }
    }
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fail_closed: false,
            poll_interval_ms: 1000,
            approval_timeout_secs: 300,
        }
    }
}

impl EnforcementConfig {
    /// Gate settings, or `None` when enforcement is off
    pub fn to_enforcement(&self) -> Option<Enforcement> {
        self.enabled.then(|| Enforcement {
            fail_closed: self.fail_closed,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            approval_timeout: Duration::from_secs(self.approval_timeout_secs),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn from_env(var: &str) -> Option<String> {
    non_empty(std::env::var(var).ok())
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Check CG_CONFIG env var
        if let Ok(env_path) = std::env::var("CG_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from CG_CONFIG: {}", e);
                    }
                }
            }
        }

        // Try CG_DIR/contextgraph.yaml
        if let Ok(cg_dir) = std::env::var("CG_DIR") {
            let path = PathBuf::from(cg_dir).join(CONFIG_FILE);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from CG_DIR: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/contextgraph/contextgraph.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("contextgraph").join(CONFIG_FILE);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./contextgraph.yaml (for development)
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn resolved_api_key(&self) -> Result<String, ConfigError> {
        non_empty(self.api_key.clone())
            .or_else(|| from_env("CG_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn resolved_agent_id(&self) -> Result<String, ConfigError> {
        non_empty(self.agent_id.clone())
            .or_else(|| from_env("CG_AGENT_ID"))
            .ok_or(ConfigError::MissingAgentId)
    }

    pub fn resolved_crew_id(&self) -> Result<String, ConfigError> {
        non_empty(self.crew_id.clone())
            .or_else(|| from_env("CG_CREW_ID"))
            .ok_or(ConfigError::MissingCrewId)
    }

    /// API base URL, falling back to CG_API_URL and then `default`
    pub fn resolved_api_url(&self, default: &str) -> String {
        non_empty(self.api_url.clone())
            .or_else(|| from_env("CG_API_URL"))
            .unwrap_or_else(|| default.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Directory holding the config file and logs
    pub fn cg_dir() -> PathBuf {
        std::env::var("CG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("contextgraph"))
    }
}
