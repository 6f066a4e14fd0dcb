//! Endpoint resolution.
//!
//! # Responsibilities
//! - Map (organization, peer name) to a reachable peer endpoint
//! - Map a channel to its ordering service endpoint

use std::collections::HashMap;
use url::Url;

use crate::config::GatewayConfig;
use crate::ledger::types::{GatewayError, GatewayResult, Orderer, PeerRef, Target};

/// Resolves logical names to network endpoints.
pub trait TopologyResolver: Send + Sync {
    fn resolve_peer(&self, peer: &PeerRef) -> GatewayResult<Target>;

    fn resolve_orderer(&self, channel_id: &str) -> GatewayResult<Orderer>;
}

/// Resolver over a fixed set of endpoints from configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticTopology {
    peers: HashMap<PeerRef, Url>,
    orderers: Vec<Orderer>,
    /// channel name -> index into `orderers`.
    channels: HashMap<String, usize>,
}

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration. Entries with invalid URLs are skipped.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut topology = Self::new();

        for org in &config.organizations {
            for peer in &org.peers {
                match Url::parse(&peer.url) {
                    Ok(url) => topology.add_peer(PeerRef::new(&org.name, &peer.name), url),
                    Err(e) => tracing::warn!(
                        organization = %org.name,
                        peer = %peer.name,
                        error = %e,
                        "Ignoring peer with invalid URL"
                    ),
                }
            }
        }

        for orderer in &config.orderers {
            match Url::parse(&orderer.url) {
                Ok(url) => topology.add_orderer(&orderer.name, url),
                Err(e) => tracing::warn!(
                    orderer = %orderer.name,
                    error = %e,
                    "Ignoring orderer with invalid URL"
                ),
            }
        }

        for channel in &config.channels {
            topology.bind_channel(&channel.name, &channel.orderer);
        }

        topology
    }

    pub fn add_peer(&mut self, peer: PeerRef, url: Url) {
        self.peers.insert(peer, url);
    }

    pub fn add_orderer(&mut self, name: &str, url: Url) {
        self.orderers.push(Orderer {
            name: name.to_string(),
            url,
        });
    }

    /// Bind a channel to a previously added orderer. Unknown orderers are ignored.
    pub fn bind_channel(&mut self, channel_id: &str, orderer: &str) {
        match self.orderers.iter().position(|o| o.name == orderer) {
            Some(idx) => {
                self.channels.insert(channel_id.to_string(), idx);
            }
            None => tracing::warn!(
                channel = %channel_id,
                orderer = %orderer,
                "Channel bound to unknown orderer"
            ),
        }
    }
}

impl TopologyResolver for StaticTopology {
    fn resolve_peer(&self, peer: &PeerRef) -> GatewayResult<Target> {
        self.peers
            .get(peer)
            .map(|url| Target {
                organization: peer.organization.clone(),
                name: peer.name.clone(),
                url: url.clone(),
            })
            .ok_or_else(|| GatewayError::NetworkUnreachable {
                target: peer.to_string(),
                reason: "peer is not part of the network topology".to_string(),
            })
    }

    /// Channels without an explicit binding use the first configured orderer.
    fn resolve_orderer(&self, channel_id: &str) -> GatewayResult<Orderer> {
        let idx = self.channels.get(channel_id).copied().unwrap_or(0);
        self.orderers
            .get(idx)
            .cloned()
            .ok_or_else(|| GatewayError::NetworkUnreachable {
                target: format!("orderer for channel '{}'", channel_id),
                reason: "no ordering service configured".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelConfig, OrdererConfig, OrganizationConfig, PeerConfig};

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.organizations.push(OrganizationConfig {
            name: "org1".into(),
            msp_id: "Org1MSP".into(),
            peers: vec![
                PeerConfig {
                    name: "peer1".into(),
                    url: "http://127.0.0.1:7051".into(),
                },
                PeerConfig {
                    name: "broken".into(),
                    url: "::not-a-url".into(),
                },
            ],
        });
        config.orderers.push(OrdererConfig {
            name: "orderer0".into(),
            url: "http://127.0.0.1:7050".into(),
        });
        config.orderers.push(OrdererConfig {
            name: "orderer1".into(),
            url: "http://127.0.0.1:8050".into(),
        });
        config.channels.push(ChannelConfig {
            name: "tradechannel".into(),
            orderer: "orderer1".into(),
        });
        config
    }

    #[test]
    fn test_resolve_peer() {
        let topology = StaticTopology::from_config(&config());
        let target = topology.resolve_peer(&PeerRef::new("org1", "peer1")).unwrap();
        assert_eq!(target.url.as_str(), "http://127.0.0.1:7051/");
        assert_eq!(target.to_string(), "org1/peer1");
    }

    #[test]
    fn test_unknown_and_invalid_peers_unreachable() {
        let topology = StaticTopology::from_config(&config());
        for name in ["peer9", "broken"] {
            let err = topology.resolve_peer(&PeerRef::new("org1", name)).unwrap_err();
            assert_eq!(err.kind(), "NetworkUnreachable");
        }
    }

    #[test]
    fn test_resolve_orderer_by_channel() {
        let topology = StaticTopology::from_config(&config());
        assert_eq!(topology.resolve_orderer("tradechannel").unwrap().name, "orderer1");
        assert_eq!(topology.resolve_orderer("other").unwrap().name, "orderer0");
    }

    #[test]
    fn test_no_orderer_configured() {
        let topology = StaticTopology::new();
        assert!(topology.resolve_orderer("mychannel").is_err());
    }
}
