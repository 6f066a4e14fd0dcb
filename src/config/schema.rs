//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Per-call deadlines.
    pub timeouts: TimeoutConfig,

    /// Chaincode calling conventions.
    pub chaincode: ChaincodeConfig,

    /// Where enrolled identities are stored.
    pub identity: IdentityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Organizations and their peers.
    pub organizations: Vec<OrganizationConfig>,

    /// Ordering service endpoints.
    pub orderers: Vec<OrdererConfig>,

    /// Channel to orderer bindings.
    pub channels: Vec<ChannelConfig>,
}

/// Timeout configuration for network calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-target endorsement dispatch timeout in seconds.
    pub proposal_secs: u64,

    /// Orderer broadcast timeout in seconds.
    pub orderer_secs: u64,

    /// Single-peer query timeout in seconds.
    pub query_secs: u64,

    /// Commit notification wait in seconds.
    pub commit_secs: u64,
}

impl TimeoutConfig {
    pub fn proposal(&self) -> Duration {
        Duration::from_secs(self.proposal_secs)
    }

    pub fn orderer(&self) -> Duration {
        Duration::from_secs(self.orderer_secs)
    }

    pub fn query(&self) -> Duration {
        Duration::from_secs(self.query_secs)
    }

    pub fn commit(&self) -> Duration {
        Duration::from_secs(self.commit_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            proposal_secs: 45,
            orderer_secs: 45,
            query_secs: 45,
            commit_secs: 30,
        }
    }
}

/// Chaincode calling conventions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChaincodeConfig {
    /// Function name used for invoke and query proposals; the caller's
    /// argument list is passed whole.
    pub invoke_function: String,
}

impl Default for ChaincodeConfig {
    fn default() -> Self {
        Self {
            invoke_function: "invoke".to_string(),
        }
    }
}

/// Identity store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Directory holding `{org}/{username}.json` user records.
    pub keystore_path: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            keystore_path: "./keystore".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// An organization and the peers it operates.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrganizationConfig {
    /// Organization name used in requests (e.g., "org1").
    pub name: String,

    /// Membership service provider id (e.g., "Org1MSP").
    pub msp_id: String,

    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

/// Peer endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PeerConfig {
    /// Logical peer name, unique within its organization.
    pub name: String,

    /// Base URL (e.g., "http://127.0.0.1:7051").
    pub url: String,
}

/// Orderer endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdererConfig {
    pub name: String,
    pub url: String,
}

/// Channel binding to an orderer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub name: String,

    /// Name of an entry in `orderers`.
    pub orderer: String,
}
