//! Core data model and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Status code a peer or orderer reports for a successful call.
pub const SUCCESS_STATUS: u16 = 200;

/// Errors that can occur during gateway operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// No usable signing identity.
    #[error("Identity error: {0}")]
    Identity(String),

    /// Target or orderer could not be resolved or contacted.
    #[error("Network unreachable: {target}: {reason}")]
    NetworkUnreachable { target: String, reason: String },

    /// A target answered with a non-success status.
    #[error("Proposal rejected by {target}: status {status}: {message}")]
    ProposalRejected {
        target: String,
        status: u16,
        message: String,
    },

    /// Good-status responses carried different payloads.
    #[error("Endorsement mismatch: payload from {target} differs from {reference}")]
    EndorsementMismatch { target: String, reference: String },

    /// Malformed argument or identifier encoding.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Orderer rejected or dropped the transaction.
    #[error("Submission failure for transaction {tx_id}: {reason}")]
    SubmissionFailure { tx_id: String, reason: String },

    /// Operation invoked from a state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Proposal was built with an empty target set.
    #[error("No targets supplied for proposal")]
    NoTargets,

    /// Single-peer ledger query failed.
    #[error("Query failed on {target}: {reason}")]
    QueryFailure { target: String, reason: String },

    /// Caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Stable tag naming the failure kind, for structured error output.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Identity(_) => "IdentityError",
            GatewayError::NetworkUnreachable { .. } => "NetworkUnreachable",
            GatewayError::ProposalRejected { .. } => "ProposalRejected",
            GatewayError::EndorsementMismatch { .. } => "EndorsementMismatch",
            GatewayError::Decode(_) => "DecodeError",
            GatewayError::SubmissionFailure { .. } => "SubmissionFailure",
            GatewayError::InvalidState(_) => "InvalidStateError",
            GatewayError::NoTargets => "NoTargetsError",
            GatewayError::QueryFailure { .. } => "QueryFailure",
            GatewayError::Cancelled => "Cancelled",
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Unresolved reference to a peer, as requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerRef {
    pub organization: String,
    pub name: String,
}

impl PeerRef {
    pub fn new(organization: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PeerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.name)
    }
}

/// Parses `org/name`.
impl FromStr for PeerRef {
    type Err = GatewayError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.split_once('/') {
            Some((org, name)) if !org.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(PeerRef::new(org, name))
            }
            _ => Err(GatewayError::Decode(format!(
                "Peer '{}' is not of the form organization/name",
                raw
            ))),
        }
    }
}

/// A peer resolved to a network address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub organization: String,
    pub name: String,
    pub url: Url,
}

impl Target {
    pub fn peer_ref(&self) -> PeerRef {
        PeerRef::new(&self.organization, &self.name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.name)
    }
}

/// An ordering service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orderer {
    pub name: String,
    pub url: Url,
}

/// Chaincode identity; `path` is only meaningful for install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub version: String,
}

impl ChaincodeDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            version: version.into(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Kind of proposal sent to endorsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    Install,
    Instantiate,
    Invoke,
    Query,
}

impl ProposalKind {
    /// Whether an endorsed proposal of this kind goes on to the orderer.
    pub fn requires_ordering(self) -> bool {
        matches!(self, ProposalKind::Instantiate | ProposalKind::Invoke)
    }

    /// Whether endorsers must agree on the response payload.
    pub fn requires_payload_agreement(self) -> bool {
        self.requires_ordering()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProposalKind::Install => "install",
            ProposalKind::Instantiate => "instantiate",
            ProposalKind::Invoke => "invoke",
            ProposalKind::Query => "query",
        }
    }
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A peer's signed attestation over its simulation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    /// Serialized identity of the endorsing peer.
    #[serde(with = "b64")]
    pub endorser: Vec<u8>,
    #[serde(with = "b64")]
    pub signature: Vec<u8>,
}

/// Why no real response was collected from a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    /// Topology could not resolve the peer.
    Unresolved(String),
    /// Transport-level failure talking to the peer.
    Unreachable(String),
    /// No answer within the per-target timeout.
    TimedOut(Duration),
    /// Dispatch abandoned on caller cancellation.
    Cancelled,
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchFailure::Unresolved(reason) => write!(f, "unresolved: {}", reason),
            DispatchFailure::Unreachable(reason) => write!(f, "unreachable: {}", reason),
            DispatchFailure::TimedOut(after) => write!(f, "timed out after {:?}", after),
            DispatchFailure::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// One target's answer to a proposal, real or synthetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalResponse {
    pub target: PeerRef,
    pub status: u16,
    pub message: String,
    pub payload: Vec<u8>,
    pub endorsement: Option<Endorsement>,
    /// Set when the response was synthesized for a failed dispatch.
    pub failure: Option<DispatchFailure>,
}

impl ProposalResponse {
    /// Synthetic response standing in for a target that did not answer.
    pub fn failed(target: PeerRef, failure: DispatchFailure) -> Self {
        Self {
            target,
            status: 0,
            message: failure.to_string(),
            payload: Vec::new(),
            endorsement: None,
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.status == SUCCESS_STATUS
    }
}

/// Outcome of handing an endorsed transaction to the ordering service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// Orderer accepted the envelope; ledger commit not observed.
    AcceptedByOrderer { tx_id: String },
    /// A commit notification confirmed the transaction in a block.
    Committed { tx_id: String, block_number: u64 },
    /// Orderer or committing peers refused the transaction.
    Rejected { tx_id: String, reason: String },
    /// The orderer did not answer the broadcast within its deadline.
    TimedOut { tx_id: String },
}

impl CommitOutcome {
    pub fn tx_id(&self) -> &str {
        match self {
            CommitOutcome::AcceptedByOrderer { tx_id }
            | CommitOutcome::Committed { tx_id, .. }
            | CommitOutcome::Rejected { tx_id, .. }
            | CommitOutcome::TimedOut { tx_id } => tx_id,
        }
    }

    /// Surface rejection and timeout as `SubmissionFailure`.
    pub fn into_result(self) -> GatewayResult<CommitOutcome> {
        match self {
            CommitOutcome::Rejected { tx_id, reason } => {
                Err(GatewayError::SubmissionFailure { tx_id, reason })
            }
            CommitOutcome::TimedOut { tx_id } => Err(GatewayError::SubmissionFailure {
                tx_id,
                reason: "orderer did not answer the broadcast before the deadline".to_string(),
            }),
            outcome => Ok(outcome),
        }
    }
}

/// Lifecycle state of a state-changing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Created,
    Proposed,
    Endorsed,
    Rejected,
    Submitted,
    AcceptedByOrderer,
    Committed,
    SubmissionFailed,
}

/// Tracks one transaction through its lifecycle and refuses illegal moves.
#[derive(Debug)]
pub struct TxLifecycle {
    tx_id: String,
    kind: ProposalKind,
    state: TxState,
}

impl TxLifecycle {
    pub fn new(tx_id: impl Into<String>, kind: ProposalKind) -> Self {
        Self {
            tx_id: tx_id.into(),
            kind,
            state: TxState::Created,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn advance(&mut self, next: TxState) -> GatewayResult<()> {
        use TxState::*;

        let allowed = match (self.state, next) {
            (Created, Proposed) => true,
            (Proposed, Endorsed) | (Proposed, Rejected) => true,
            (Endorsed, Submitted) => self.kind.requires_ordering(),
            (Submitted, AcceptedByOrderer) | (Submitted, SubmissionFailed) => true,
            (AcceptedByOrderer, Committed) | (AcceptedByOrderer, SubmissionFailed) => true,
            _ => false,
        };

        if !allowed {
            return Err(GatewayError::InvalidState(format!(
                "{} transaction {} cannot move from {:?} to {:?}",
                self.kind, self.tx_id, self.state, next
            )));
        }

        tracing::debug!(
            tx_id = %self.tx_id,
            from = ?self.state,
            to = ?next,
            "Transaction state changed"
        );
        self.state = next;
        Ok(())
    }
}

/// Serde adapter carrying byte fields as base64 strings.
pub(crate) mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }

    /// Same encoding for a list of byte strings.
    pub mod vec {
        use base64::{engine::general_purpose::STANDARD, Engine};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            items: &[Vec<u8>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(items.iter().map(|item| STANDARD.encode(item)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<u8>>, D::Error> {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|encoded| STANDARD.decode(encoded.as_bytes()))
                .collect::<Result<_, _>>()
                .map_err(serde::de::Error::custom)
        }
    }
}
