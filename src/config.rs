//! Configuration management with validation and defaults
//!
//! A TOML file supplies the node connection and the agent runtime settings;
//! `DICEBOT_*` environment variables override the file. House address, server
//! secret, payout multiplier, win threshold and fee are build-time constants
//! (see `constants`), not configuration.

use crate::constants::{DEFAULT_RUN_DURATION_SECS, DEFAULT_SHUTDOWN_GRACE_SECS, EVENT_QUEUE_CAPACITY};
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Signing RPCs the agent knows how to call
pub const SUPPORTED_SIGN_METHODS: &[&str] = &["signrawtransactionwithwallet", "signrawtransaction"];

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub node: NodeConfig,
    pub agent: RuntimeConfig,
}

/// Wallet node connection
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Wallet name for multi-wallet nodes; `None` uses the default wallet
    pub wallet: Option<String>,
    pub sign_method: String,
    pub request_timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: 18443, // regtest
            user: String::new(),
            password: String::new(),
            wallet: None,
            sign_method: "signrawtransactionwithwallet".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl NodeConfig {
    pub fn endpoint(&self) -> String {
        match &self.wallet {
            Some(wallet) => format!("{}://{}:{}/wallet/{}", self.protocol, self.host, self.port, wallet),
            None => format!("{}://{}:{}/", self.protocol, self.host, self.port),
        }
    }

    /// Printable form without the password
    pub fn redacted(&self) -> String {
        format!(
            "{} user={} wallet={} sign_method={}",
            self.endpoint(),
            self.user,
            self.wallet.as_deref().unwrap_or("<default>"),
            self.sign_method
        )
    }
}

/// Agent runtime settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub notify_host: String,
    /// 0 picks an ephemeral port
    pub notify_port: u16,
    pub run_duration_secs: u64,
    pub shutdown_grace_secs: u64,
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            notify_host: "127.0.0.1".to_string(),
            notify_port: 5160,
            run_duration_secs: DEFAULT_RUN_DURATION_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            queue_capacity: EVENT_QUEUE_CAPACITY,
        }
    }
}

impl AgentConfig {
    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.node.host.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired("node.host".to_string()));
        }
        if self.node.user.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired("node.user".to_string()));
        }
        if self.node.port == 0 {
            return Err(invalid("node.port", "0", "must be > 0"));
        }
        if !matches!(self.node.protocol.as_str(), "http" | "https") {
            return Err(invalid("node.protocol", &self.node.protocol, "expected http or https"));
        }
        if !SUPPORTED_SIGN_METHODS.contains(&self.node.sign_method.as_str()) {
            return Err(invalid(
                "node.sign_method",
                &self.node.sign_method,
                "unsupported signing rpc",
            ));
        }
        if self.node.request_timeout_secs == 0 {
            return Err(invalid("node.request_timeout_secs", "0", "must be > 0"));
        }
        if self.agent.run_duration_secs == 0 {
            return Err(invalid("agent.run_duration_secs", "0", "must be > 0"));
        }
        if self.agent.queue_capacity == 0 {
            return Err(invalid("agent.queue_capacity", "0", "must be > 0"));
        }
        Ok(())
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.agent.run_duration_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.agent.shutdown_grace_secs)
    }

    pub fn notify_addr(&self) -> String {
        format!("{}:{}", self.agent.notify_host, self.agent.notify_port)
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// File (or defaults), then environment overrides, then validation.
    pub fn load(&self) -> Result<AgentConfig, ConfigurationError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// File (or defaults) plus environment overrides. The caller may adjust
    /// the result further and must `validate()` it before use.
    pub fn load_unvalidated(&self) -> Result<AgentConfig, ConfigurationError> {
        let mut config = match &self.config_path {
            Some(path) => Self::load_from_file(path)?,
            None => AgentConfig::default(),
        };
        apply_overrides(&mut config, |key| env::var(key).ok())?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<AgentConfig, ConfigurationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }
}

/// Apply `DICEBOT_*` overrides from `lookup`.
pub fn apply_overrides<F>(config: &mut AgentConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("DICEBOT_NODE_HOST") {
        config.node.host = host;
    }
    if let Some(port) = lookup("DICEBOT_NODE_PORT") {
        config.node.port = parse_number("DICEBOT_NODE_PORT", &port)?;
    }
    if let Some(user) = lookup("DICEBOT_NODE_USER") {
        config.node.user = user;
    }
    if let Some(password) = lookup("DICEBOT_NODE_PASSWORD") {
        config.node.password = password;
    }
    if let Some(wallet) = lookup("DICEBOT_NODE_WALLET") {
        config.node.wallet = Some(wallet).filter(|w| !w.is_empty());
    }
    if let Some(port) = lookup("DICEBOT_NOTIFY_PORT") {
        config.agent.notify_port = parse_number("DICEBOT_NOTIFY_PORT", &port)?;
    }
    if let Some(secs) = lookup("DICEBOT_RUN_DURATION_SECS") {
        config.agent.run_duration_secs = parse_number("DICEBOT_RUN_DURATION_SECS", &secs)?;
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigurationError> {
    value.trim().parse().map_err(|_| ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: "not a valid number".to_string(),
    })
}
