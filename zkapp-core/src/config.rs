//! Configuration for the zkApp engine

use crate::hash::{prefixes, HasherKind};
use crate::types::DEFAULT_ACCOUNT_CREATION_FEE;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Protocol constants
    pub protocol: ProtocolConstants,

    /// Network the commitments are bound to
    pub network_id: NetworkId,

    /// What happens to the subtree of a failed update
    pub child_failure_policy: ChildFailurePolicy,

    /// Hash function for commitments
    pub hasher: HasherKind,

    /// Record prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: ProtocolConstants::default(),
            network_id: NetworkId::Testnet,
            child_failure_policy: ChildFailurePolicy::Isolated,
            hasher: HasherKind::Sha256,
            metrics_enabled: false,
        }
    }
}

/// Protocol constants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConstants {
    /// Fee burned when an account is created
    pub account_creation_fee: u64,
}

impl Default for ProtocolConstants {
    fn default() -> Self {
        Self {
            account_creation_fee: DEFAULT_ACCOUNT_CREATION_FEE, // 1 MINA
        }
    }
}

/// Network identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// Mainnet
    Mainnet,
    /// Any test network
    Testnet,
}

impl NetworkId {
    /// Prefix for account-update body commitments
    pub fn body_prefix(&self) -> &'static str {
        match self {
            NetworkId::Mainnet => prefixes::ZKAPP_BODY_MAINNET,
            NetworkId::Testnet => prefixes::ZKAPP_BODY_TESTNET,
        }
    }
}

impl FromStr for NetworkId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkId::Mainnet),
            "testnet" => Ok(NetworkId::Testnet),
            other => Err(crate::Error::Config(format!("unknown network id: {}", other))),
        }
    }
}

/// Treatment of the children of a failed account update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildFailurePolicy {
    /// Children are still evaluated; only reuse of a failed account id is skipped
    #[default]
    Isolated,
    /// Every descendant of a failed update is skipped
    SkipDescendants,
}

impl FromStr for ChildFailurePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "isolated" => Ok(ChildFailurePolicy::Isolated),
            "skip_descendants" => Ok(ChildFailurePolicy::SkipDescendants),
            other => Err(crate::Error::Config(format!(
                "unknown child failure policy: {}",
                other
            ))),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(network) = std::env::var("ZKAPP_NETWORK_ID") {
            config.network_id = network.parse()?;
        }

        if let Ok(fee) = std::env::var("ZKAPP_ACCOUNT_CREATION_FEE") {
            config.protocol.account_creation_fee = fee.parse().map_err(|e| {
                crate::Error::Config(format!("invalid ZKAPP_ACCOUNT_CREATION_FEE: {}", e))
            })?;
        }

        if let Ok(policy) = std::env::var("ZKAPP_CHILD_FAILURE_POLICY") {
            config.child_failure_policy = policy.parse()?;
        }

        if let Ok(hasher) = std::env::var("ZKAPP_HASHER") {
            config.hasher = hasher.parse()?;
        }

        if let Ok(enabled) = std::env::var("ZKAPP_METRICS_ENABLED") {
            config.metrics_enabled = enabled == "1" || enabled.eq_ignore_ascii_case("true");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.protocol.account_creation_fee, 1_000_000_000);
        assert_eq!(config.child_failure_policy, ChildFailurePolicy::Isolated);
        assert_eq!(config.hasher, HasherKind::Sha256);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
network_id = "mainnet"
child_failure_policy = "skip_descendants"
hasher = "blake3"

[protocol]
account_creation_fee = 5
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network_id, NetworkId::Mainnet);
        assert_eq!(config.child_failure_policy, ChildFailurePolicy::SkipDescendants);
        assert_eq!(config.hasher, HasherKind::Blake3);
        assert_eq!(config.protocol.account_creation_fee, 5);
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network_id = 12").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_body_prefix_per_network() {
        assert_ne!(NetworkId::Mainnet.body_prefix(), NetworkId::Testnet.body_prefix());
    }
}
