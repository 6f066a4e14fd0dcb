//! Transaction orchestration and ledger query core.
//!
//! # Data Flow
//! ```text
//! Identity + channel
//!     → context.rs (nonce, transaction id)
//!     → proposal.rs (payload, creator signature)
//!     → orchestrator.rs (concurrent fan-out, per-target timeout)
//!     → endorsement.rs (unanimous acceptance, payload agreement)
//!     → submitter.rs (envelope → orderer → optional commit notification)
//!
//! Queries:
//!     → args.rs (identifier parsing, before any network call)
//!     → query.rs (one read-only proposal to one peer)
//! ```
//!
//! # Security Constraints
//! - Every attempt mints a fresh nonce and transaction id
//! - Proposals and envelopes are signed by the caller's identity
//! - No identity, channel or peer is remembered between operations

pub mod args;
pub mod context;
pub mod endorsement;
pub mod gateway;
pub mod orchestrator;
pub mod proposal;
pub mod query;
pub mod submitter;
pub mod transport;
pub mod types;

pub use endorsement::EndorsementResult;
pub use gateway::Gateway;
pub use query::{
    Block, BlockHeader, ChainInfo, ChaincodeSummary, ChaincodeValue, ChannelSummary,
    LedgerQueryEngine, ProcessedTransaction, QueryResult,
};
pub use submitter::{
    CommitNotifier, CommitStatus, Envelope, PollingCommitNotifier, TransactionSubmitter,
};
pub use transport::{BroadcastResponse, HttpTransport, PeerResponse, PeerTransport};
pub use types::{
    ChaincodeDescriptor, CommitOutcome, DispatchFailure, Endorsement, GatewayError,
    GatewayResult, Orderer, PeerRef, ProposalKind, ProposalResponse, Target, TxLifecycle,
    TxState,
};
