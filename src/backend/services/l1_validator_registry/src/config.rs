//! TOML configuration, and the immutable settings derived from it once at startup.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::chain::EvmAddress;
use crate::models::ids::Id;
use crate::services::signature_aggregator::QuorumPercentage;
use crate::utils::errors::ConfigError;
use crate::utils::retry::RetryPolicy;

/// Read-only settings shared by every registration session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationSettings {
    pub network_id: u32,
    /// Subnet whose validators sign both registration messages.
    pub subnet_id: Id,
    /// Source chain of the acknowledgment message.
    pub p_chain_id: Id,
    pub quorum_percentage: QuorumPercentage,
    /// Lowest block the justification scan looks at.
    pub scan_from_block: u64,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub p_chain_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            network_id: 1337,
            subnet_id: Id::ZERO,
            p_chain_id: Id::ZERO,
            quorum_percentage: QuorumPercentage::default(),
            scan_from_block: 0,
            receipt_timeout: Duration::from_secs(120),
            receipt_poll_interval: Duration::from_secs(1),
            p_chain_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub network_id: u32,
    pub subnet_id: String,
    pub p_chain_id: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network_id: 1337,
            subnet_id: "2W9boARgCWL25z6pMFNtkCfNA5v28VGg9PmBgUJfuKndEdhrvw".to_string(),
            p_chain_id: "11111111111111111111111111111111LpoYY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub l1_rpc_url: String,
    pub p_chain_url: String,
    pub aggregator_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            l1_rpc_url: "http://127.0.0.1:9654/ext/bc/W7exTJDk7vtXXdQkMdxNNqbzTUTE2smZKfF2XmbRRqWjUXe8s/rpc"
                .to_string(),
            p_chain_url: "http://127.0.0.1:9650/ext/bc/P".to_string(),
            aggregator_url: "http://127.0.0.1:9092".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    pub validator_manager_address: String,
    /// Node-managed account used for `eth_sendTransaction`. Read-only commands work without it.
    pub sender_address: Option<String>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            validator_manager_address: "0x0Feedc0de0000000000000000000000000000000".to_string(),
            sender_address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub quorum_percentage: u8,
    pub scan_from_block: u64,
    pub max_blocks_per_query: Option<u64>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            quorum_percentage: QuorumPercentage::DEFAULT.get(),
            scan_from_block: 0,
            max_blocks_per_query: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub rpc_timeout_secs: u64,
    pub aggregation_timeout_secs: u64,
    pub receipt_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    pub p_chain_timeout_secs: u64,
    pub log_scan_timeout_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: 10,
            aggregation_timeout_secs: 60,
            receipt_timeout_secs: 120,
            receipt_poll_interval_ms: 1000,
            p_chain_timeout_secs: 120,
            log_scan_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_delay_ms: 500,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    pub network: NetworkConfig,
    pub endpoints: EndpointConfig,
    pub contract: ContractConfig,
    pub registration: RegistrationConfig,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
}

impl RegistrarConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Validates the file and converts it into the settings the services consume.
    pub fn settings(&self) -> Result<RegistrationSettings, ConfigError> {
        let quorum_percentage = QuorumPercentage::new(self.registration.quorum_percentage)
            .map_err(|e| ConfigError::InvalidField {
                field: "registration.quorum_percentage",
                reason: e.to_string(),
            })?;

        Ok(RegistrationSettings {
            network_id: self.network.network_id,
            subnet_id: parse_id("network.subnet_id", &self.network.subnet_id)?,
            p_chain_id: parse_id("network.p_chain_id", &self.network.p_chain_id)?,
            quorum_percentage,
            scan_from_block: self.registration.scan_from_block,
            receipt_timeout: Duration::from_secs(self.timeouts.receipt_timeout_secs),
            receipt_poll_interval: Duration::from_millis(self.timeouts.receipt_poll_interval_ms),
            p_chain_timeout: Duration::from_secs(self.timeouts.p_chain_timeout_secs),
            retry: self.retry_policy(),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_count: self.retry.retry_count,
            retry_delay: Duration::from_millis(self.retry.retry_delay_ms),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.rpc_timeout_secs)
    }

    pub fn aggregation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.aggregation_timeout_secs)
    }

    pub fn log_scan_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.log_scan_timeout_secs)
    }

    pub fn validator_manager_address(&self) -> Result<EvmAddress, ConfigError> {
        parse_evm_address(
            "contract.validator_manager_address",
            &self.contract.validator_manager_address,
        )
    }

    pub fn sender_address(&self) -> Result<Option<EvmAddress>, ConfigError> {
        self.contract
            .sender_address
            .as_deref()
            .map(|s| parse_evm_address("contract.sender_address", s))
            .transpose()
    }
}

fn parse_id(field: &'static str, s: &str) -> Result<Id, ConfigError> {
    s.parse().map_err(|e: crate::utils::errors::ParseError| ConfigError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

/// Parses a `0x`-prefixed, 20-byte address. Checksum casing is accepted but not verified.
pub fn parse_evm_address(field: &'static str, s: &str) -> Result<EvmAddress, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidField { field, reason };
    let stripped = s
        .strip_prefix("0x")
        .ok_or_else(|| invalid("missing 0x prefix".to_string()))?;
    let bytes = hex::decode(stripped).map_err(|e| invalid(e.to_string()))?;
    if bytes.len() != 20 {
        return Err(invalid(format!("expected 20 bytes, got {}", bytes.len())));
    }
    Ok(EvmAddress::from_slice(&bytes))
}
