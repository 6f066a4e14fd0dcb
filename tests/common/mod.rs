//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chaincode_gateway::config::GatewayConfig;
use chaincode_gateway::identity::Identity;
use chaincode_gateway::ledger::proposal::{ProposalPayload, SignedProposal};
use chaincode_gateway::ledger::{
    BroadcastResponse, CommitNotifier, CommitStatus, Endorsement, Envelope, Gateway,
    GatewayError, GatewayResult, Orderer, PeerRef, PeerResponse, PeerTransport, Target,
};
use chaincode_gateway::topology::StaticTopology;

pub const CHANNEL: &str = "mychannel";

/// How a mock peer or orderer answers.
#[derive(Debug, Clone)]
pub enum Reply {
    Status {
        status: u16,
        payload: Vec<u8>,
        delay: Duration,
    },
    Fail(String),
    /// Never answers.
    Hang,
}

impl Reply {
    pub fn ok(payload: &str) -> Self {
        Reply::Status {
            status: 200,
            payload: payload.as_bytes().to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Reply::Status {
            status,
            payload: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(self, delay: Duration) -> Self {
        match self {
            Reply::Status { status, payload, .. } => Reply::Status {
                status,
                payload,
                delay,
            },
            other => other,
        }
    }
}

/// Scripted in-memory peers and orderer.
#[derive(Default)]
pub struct MockTransport {
    peers: Mutex<HashMap<String, Reply>>,
    orderer: Mutex<Option<Reply>>,
    proposal_calls: AtomicUsize,
    proposals: Mutex<Vec<(String, ProposalPayload)>>,
    broadcasts: Mutex<Vec<Envelope>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script `peer` ("org/name"). Unscripted peers answer 200 with no payload.
    pub fn script(&self, peer: &str, reply: Reply) {
        self.peers.lock().unwrap().insert(peer.to_string(), reply);
    }

    pub fn script_orderer(&self, reply: Reply) {
        *self.orderer.lock().unwrap() = Some(reply);
    }

    pub fn proposal_calls(&self) -> usize {
        self.proposal_calls.load(Ordering::SeqCst)
    }

    /// Decoded proposals in arrival order, keyed by peer.
    pub fn proposals(&self) -> Vec<(String, ProposalPayload)> {
        self.proposals.lock().unwrap().clone()
    }

    pub fn broadcasts(&self) -> Vec<Envelope> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn process_proposal(
        &self,
        target: &Target,
        proposal: &SignedProposal,
    ) -> GatewayResult<PeerResponse> {
        let peer = target.to_string();
        self.proposal_calls.fetch_add(1, Ordering::SeqCst);
        let payload = proposal.decode_payload()?;
        self.proposals.lock().unwrap().push((peer.clone(), payload));

        let reply = self
            .peers
            .lock()
            .unwrap()
            .get(&peer)
            .cloned()
            .unwrap_or_else(|| Reply::ok(""));

        match reply {
            Reply::Status {
                status,
                payload,
                delay,
            } => {
                tokio::time::sleep(delay).await;
                Ok(PeerResponse {
                    status,
                    message: if status == 200 {
                        String::new()
                    } else {
                        format!("{} refused", peer)
                    },
                    payload,
                    endorsement: Some(Endorsement {
                        endorser: peer.into_bytes(),
                        signature: vec![7; 64],
                    }),
                })
            }
            Reply::Fail(reason) => Err(GatewayError::NetworkUnreachable {
                target: peer,
                reason,
            }),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn broadcast(
        &self,
        orderer: &Orderer,
        envelope: &Envelope,
    ) -> GatewayResult<BroadcastResponse> {
        self.broadcasts.lock().unwrap().push(envelope.clone());
        let reply = self
            .orderer
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Reply::status(200));

        match reply {
            Reply::Status { status, delay, .. } => {
                tokio::time::sleep(delay).await;
                Ok(BroadcastResponse {
                    status,
                    info: if status == 200 {
                        "SUCCESS".into()
                    } else {
                        "BAD_REQUEST".into()
                    },
                })
            }
            Reply::Fail(reason) => Err(GatewayError::NetworkUnreachable {
                target: orderer.name.clone(),
                reason,
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Commit notifier returning a fixed verdict.
pub struct MockNotifier {
    pub verdict: GatewayResult<CommitStatus>,
}

#[async_trait]
impl CommitNotifier for MockNotifier {
    async fn wait_for_commit(&self, _: &str, _: &str) -> GatewayResult<CommitStatus> {
        self.verdict.clone()
    }
}

/// Commit notifier that never delivers a verdict.
pub struct SilentNotifier;

#[async_trait]
impl CommitNotifier for SilentNotifier {
    async fn wait_for_commit(&self, _: &str, _: &str) -> GatewayResult<CommitStatus> {
        std::future::pending().await
    }
}

pub fn identity() -> Identity {
    Identity::from_hex_key(
        "admin",
        "org1",
        "Org1MSP",
        b"-----BEGIN CERTIFICATE-----\nTEST\n-----END CERTIFICATE-----\n".to_vec(),
        "0101010101010101010101010101010101010101010101010101010101010101",
    )
    .unwrap()
}

pub fn peer(name: &str) -> PeerRef {
    let (org, peer) = name.split_once('/').unwrap();
    PeerRef::new(org, peer)
}

pub fn topology() -> StaticTopology {
    let mut topology = StaticTopology::new();
    for (i, name) in ["org1/peer1", "org1/peer2", "org1/peer3", "org2/peer1"].iter().enumerate() {
        let url = format!("http://127.0.0.1:{}", 7051 + i).parse().unwrap();
        topology.add_peer(peer(name), url);
    }
    topology.add_orderer("orderer0", "http://127.0.0.1:7050".parse().unwrap());
    topology.bind_channel(CHANNEL, "orderer0");
    topology
}

pub fn gateway(transport: Arc<MockTransport>) -> Gateway {
    gateway_with(&GatewayConfig::default(), transport)
}

pub fn gateway_with(config: &GatewayConfig, transport: Arc<MockTransport>) -> Gateway {
    Gateway::new(config, Arc::new(topology()), transport)
}
