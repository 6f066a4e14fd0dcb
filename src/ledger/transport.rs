//! Network transport to peers and orderers.
//!
//! # Responsibilities
//! - Deliver a signed proposal to one peer and return its response
//! - Deliver a transaction envelope to one orderer
//! - Map connection and protocol failures to `NetworkUnreachable`
//!
//! Deadlines are enforced by callers; a transport call runs until it
//! completes or its future is dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ledger::proposal::SignedProposal;
use crate::ledger::submitter::Envelope;
use crate::ledger::types::{b64, Endorsement, GatewayError, GatewayResult, Orderer, Target};

/// A peer's reply to a proposal, as received on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerResponse {
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default, with = "b64")]
    pub payload: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endorsement: Option<Endorsement>,
}

/// The orderer's reply to a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub status: u16,
    #[serde(default)]
    pub info: String,
}

/// Network seam between the gateway core and the ledger network.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn process_proposal(
        &self,
        target: &Target,
        proposal: &SignedProposal,
    ) -> GatewayResult<PeerResponse>;

    async fn broadcast(
        &self,
        orderer: &Orderer,
        envelope: &Envelope,
    ) -> GatewayResult<BroadcastResponse>;
}

/// JSON-over-HTTP transport.
///
/// Proposals go to `POST {peer}/v1/proposals`, envelopes to
/// `POST {orderer}/v1/broadcast`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| GatewayError::NetworkUnreachable {
                target: "http client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    async fn post<Req, Resp>(
        &self,
        endpoint: &str,
        url: &url::Url,
        path: &str,
        body: &Req,
    ) -> GatewayResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let unreachable = |reason: String| GatewayError::NetworkUnreachable {
            target: endpoint.to_string(),
            reason,
        };

        let url = url
            .join(path)
            .map_err(|e| unreachable(format!("Invalid endpoint URL '{}': {}", url, e)))?;

        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| unreachable(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| {
            unreachable(format!(
                "Malformed response (HTTP {}): {}: {}",
                status,
                e,
                String::from_utf8_lossy(&body)
            ))
        })
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn process_proposal(
        &self,
        target: &Target,
        proposal: &SignedProposal,
    ) -> GatewayResult<PeerResponse> {
        tracing::trace!(peer = %target, url = %target.url, "Sending proposal");
        self.post(&target.to_string(), &target.url, "v1/proposals", proposal)
            .await
    }

    async fn broadcast(
        &self,
        orderer: &Orderer,
        envelope: &Envelope,
    ) -> GatewayResult<BroadcastResponse> {
        tracing::trace!(orderer = %orderer.name, url = %orderer.url, "Broadcasting envelope");
        self.post(&orderer.name, &orderer.url, "v1/broadcast", envelope)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_response_defaults() {
        let resp: PeerResponse = serde_json::from_str(r#"{"status":500}"#).unwrap();
        assert_eq!(resp.status, 500);
        assert!(resp.payload.is_empty());
        assert!(resp.endorsement.is_none());
    }

    #[test]
    fn test_peer_response_payload_base64() {
        let resp: PeerResponse =
            serde_json::from_str(r#"{"status":200,"payload":"NDI="}"#).unwrap();
        assert_eq!(resp.payload, b"42".to_vec());
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        let target = Target {
            organization: "org1".into(),
            name: "peer1".into(),
            // Port 9 (discard) is closed on test hosts.
            url: "http://127.0.0.1:9".parse().unwrap(),
        };
        let signed = SignedProposal {
            proposal_bytes: b"{}".to_vec(),
            signature: Vec::new(),
        };
        let err = transport.process_proposal(&target, &signed).await.unwrap_err();
        assert_eq!(err.kind(), "NetworkUnreachable");
        assert!(err.to_string().contains("org1/peer1"));
    }
}
