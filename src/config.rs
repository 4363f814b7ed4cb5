//! Configuration management for the transaction scheduler
//!
//! Loads configuration from a TOML file with `${VAR}` substitution, then
//! applies `TX_SCHEDULER__SECTION__KEY` environment overrides.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ENV_PREFIX: &str = "TX_SCHEDULER";

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern");
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub scheduler: SchedulerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    pub chains: HashMap<String, ChainConfig>,
    #[serde(default)]
    pub contracts: Vec<ContractConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub instance_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_brokers")]
    pub brokers: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_crafter_topic")]
    pub crafter_topic: String,
    #[serde(default = "default_sender_topic")]
    pub sender_topic: String,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: default_client_id(),
            crafter_topic: default_crafter_topic(),
            sender_topic: default_sender_topic(),
            send_timeout_ms: default_send_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_secs: default_refresh_interval(),
            max_retries: default_max_retries(),
        }
    }
}

/// Static chain directory entry, keyed by chain name
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub uuid: Uuid,
    pub chain_id: String,
}

/// Static contract directory entry
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    pub name: String,
    #[serde(default = "default_contract_tag")]
    pub tag: String,
    pub bytecode: String,
    #[serde(default = "default_constructor")]
    pub constructor_signature: String,
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_client_id() -> String {
    "tx-scheduler".to_string()
}

fn default_crafter_topic() -> String {
    "topic-tx-crafter".to_string()
}

fn default_sender_topic() -> String {
    "topic-tx-sender".to_string()
}

fn default_send_timeout() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval() -> u64 {
    1
}

fn default_max_retries() -> u32 {
    10
}

pub(crate) fn default_contract_tag() -> String {
    "latest".to_string()
}

fn default_constructor() -> String {
    "()".to_string()
}

impl Settings {
    /// Load settings from `TX_SCHEDULER_CONFIG` or `config/default.toml`
    pub fn load() -> Result<Self> {
        let config_path = env::var("TX_SCHEDULER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml(&config_str)
    }

    fn from_toml(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(&config_str, config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            anyhow::bail!("At least one chain must be configured");
        }

        let mut uuids = HashSet::new();
        for (name, chain) in &self.chains {
            if chain.chain_id.is_empty() {
                anyhow::bail!("Chain {} has no chain id", name);
            }
            if !uuids.insert(chain.uuid) {
                anyhow::bail!("Chain {} reuses uuid {}", name, chain.uuid);
            }
        }

        if self.broker.crafter_topic.is_empty() || self.broker.sender_topic.is_empty() {
            anyhow::bail!("Broker topics must not be empty");
        }

        if self.listener.enabled && self.listener.refresh_interval_secs == 0 {
            anyhow::bail!("Listener refresh interval must be greater than zero");
        }

        for contract in &self.contracts {
            if contract.bytecode.is_empty() {
                tracing::warn!("Contract {}:{} has no bytecode", contract.name, contract.tag);
            }
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
