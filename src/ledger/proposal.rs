//! Proposal construction and signing.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ledger::context::TransactionContext;
use crate::ledger::types::{
    b64, ChaincodeDescriptor, GatewayError, GatewayResult, PeerRef, ProposalKind,
};

/// An unsubmitted chaincode operation addressed to a set of endorsers.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub kind: ProposalKind,
    pub targets: Vec<PeerRef>,
    pub chaincode: ChaincodeDescriptor,
    /// Chaincode function (instantiate, invoke and query).
    pub function: Option<String>,
    pub args: Vec<Vec<u8>>,
    pub context: TransactionContext,
    /// Seconds since the Unix epoch, fixed at construction.
    pub timestamp: u64,
}

impl Proposal {
    pub fn new(
        kind: ProposalKind,
        targets: Vec<PeerRef>,
        chaincode: ChaincodeDescriptor,
        context: TransactionContext,
    ) -> Self {
        Self {
            kind,
            targets,
            chaincode,
            function: None,
            args: Vec::new(),
            context,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    pub fn with_call(mut self, function: impl Into<String>, args: Vec<Vec<u8>>) -> Self {
        self.function = Some(function.into());
        self.args = args;
        self
    }

    pub fn tx_id(&self) -> &str {
        self.context.tx_id()
    }

    /// Targets in request order with duplicates removed.
    pub fn unique_targets(&self) -> Vec<PeerRef> {
        let mut seen = HashSet::new();
        self.targets
            .iter()
            .filter(|peer| seen.insert(*peer))
            .cloned()
            .collect()
    }

    /// The signed-over view of this proposal.
    pub fn payload(&self) -> ProposalPayload {
        let identity = self.context.identity();
        ProposalPayload {
            kind: self.kind,
            channel_id: self.context.channel_id().to_string(),
            tx_id: self.context.tx_id().to_string(),
            nonce: self.context.nonce().to_vec(),
            msp_id: identity.msp_id().to_string(),
            creator: identity.certificate().to_vec(),
            chaincode: self.chaincode.clone(),
            function: self.function.clone(),
            args: self.args.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Serialize the payload and sign it with the context identity.
    ///
    /// Signing is deterministic, so repeated calls yield identical bytes.
    pub fn sign(&self) -> GatewayResult<SignedProposal> {
        let proposal_bytes = serde_json::to_vec(&self.payload())
            .map_err(|e| GatewayError::Decode(format!("Failed to encode proposal: {}", e)))?;
        let signature = self.context.identity().sign(&proposal_bytes);
        Ok(SignedProposal {
            proposal_bytes,
            signature,
        })
    }
}

/// Proposal contents as transmitted to peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPayload {
    pub kind: ProposalKind,
    pub channel_id: String,
    pub tx_id: String,
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
    pub msp_id: String,
    #[serde(with = "b64")]
    pub creator: Vec<u8>,
    pub chaincode: ChaincodeDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(with = "b64::vec")]
    pub args: Vec<Vec<u8>>,
    pub timestamp: u64,
}

/// Serialized proposal plus the creator's signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProposal {
    #[serde(with = "b64")]
    pub proposal_bytes: Vec<u8>,
    #[serde(with = "b64")]
    pub signature: Vec<u8>,
}

impl SignedProposal {
    pub fn decode_payload(&self) -> GatewayResult<ProposalPayload> {
        serde_json::from_slice(&self.proposal_bytes)
            .map_err(|e| GatewayError::Decode(format!("Malformed proposal payload: {}", e)))
    }
}
