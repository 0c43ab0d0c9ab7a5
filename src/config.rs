use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agent::HttpAgentConfig;
use crate::orchestrator::{OrchestratorConfig, RetryPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub orchestrator: OrchestratorSection,
    pub agent: AgentSection,
    pub store: StoreSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    pub concurrency: usize,
    pub batch_limit: usize,
    pub task_timeout_secs: u64,
    pub store_write_attempts: u32,
    pub store_write_backoff_ms: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            concurrency: 10,
            batch_limit: 100,
            task_timeout_secs: 600,
            store_write_attempts: 2,
            store_write_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub endpoint: String,
    pub model: String,
    pub use_vision: bool,
    /// Environment variable holding the agent service API key, if any
    pub api_key_env: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        let http = HttpAgentConfig::default();
        Self {
            endpoint: http.endpoint,
            model: http.model,
            use_vision: http.use_vision,
            api_key_env: None,
            request_timeout_secs: http.request_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub database: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            database: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("orderscout")
                .join("orderscout.db"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            orchestrator: OrchestratorSection::default(),
            agent: AgentSection::default(),
            store: StoreSection::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        let o = &self.orchestrator;
        if o.concurrency == 0 {
            bail!("orchestrator.concurrency must be at least 1");
        }
        if o.batch_limit == 0 {
            bail!("orchestrator.batch_limit must be at least 1");
        }
        if o.task_timeout_secs == 0 {
            bail!("orchestrator.task_timeout_secs must be greater than zero");
        }
        if o.store_write_attempts == 0 {
            bail!("orchestrator.store_write_attempts must be at least 1");
        }
        if self.agent.endpoint.trim().is_empty() {
            bail!("agent.endpoint must not be empty");
        }
        Ok(())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let o = &self.orchestrator;
        OrchestratorConfig::new(
            o.concurrency,
            o.batch_limit,
            Duration::from_secs(o.task_timeout_secs),
            RetryPolicy::new(o.store_write_attempts, Duration::from_millis(o.store_write_backoff_ms)),
        )
    }

    pub fn http_agent_config(&self) -> HttpAgentConfig {
        HttpAgentConfig {
            endpoint: self.agent.endpoint.clone(),
            model: self.agent.model.clone(),
            use_vision: self.agent.use_vision,
            request_timeout: Duration::from_secs(self.agent.request_timeout_secs),
        }
    }
}
