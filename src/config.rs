use anyhow::{Context, Result};
use blueprint::manifest::DEFAULT_NAMESPACE;
use declarative::{OrchestratorOptions, WaitOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("bpctl"))
}

/// Settings from `~/.config/bpctl/config.toml`; every key is optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Project root used when `--project-dir` is not given
    pub project_dir: Option<PathBuf>,
    pub namespace: String,
    pub poll_interval_secs: u64,
    /// Upper bound on any wait; the graph's budget applies when unset
    pub wait_timeout_secs: Option<u64>,
    pub max_status_errors: usize,
    pub terraform_bin: String,
    pub kubectl_bin: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        let wait = WaitOptions::default();
        Self {
            project_dir: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            poll_interval_secs: wait.poll_interval.as_secs(),
            wait_timeout_secs: None,
            max_status_errors: wait.max_consecutive_errors,
            terraform_bin: "terraform".to_string(),
            kubectl_bin: "kubectl".to_string(),
        }
    }
}

impl CliConfig {
    /// Load the user config, or defaults when the file doesn't exist
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join("config.toml");
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config format in {}", path.display()))
    }

    /// Resolve the project root: flag, then config, then the current directory
    pub fn project_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.project_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            timeout: self.wait_timeout_secs.map(Duration::from_secs),
            max_consecutive_errors: self.max_status_errors,
        }
    }

    pub fn orchestrator_options(&self, dry_run: bool) -> OrchestratorOptions {
        OrchestratorOptions {
            dry_run,
            namespace: self.namespace.clone(),
            wait: self.wait_options(),
        }
    }
}
