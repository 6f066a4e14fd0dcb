//! Transaction submission to the ordering service.
//!
//! # Data Flow
//! ```text
//! EndorsementResult ──▶ assemble ──▶ Envelope ──▶ orderer broadcast
//!                                                      │
//!                                   AcceptedByOrderer ◀┘
//!                                          │ (notifier configured)
//!                                          ▼
//!                                  Committed / Rejected
//! ```
//!
//! Without a commit notifier the outcome stops at `AcceptedByOrderer`:
//! the orderer taking the envelope does not mean the ledger committed it.
//! A notifier that errors or stays silent past the commit timeout leaves
//! the outcome at `AcceptedByOrderer` too. `TimedOut` is reserved for an
//! orderer that never answered the broadcast.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::identity::Identity;
use crate::ledger::endorsement::EndorsementResult;
use crate::ledger::query::LedgerQueryEngine;
use crate::ledger::transport::PeerTransport;
use crate::ledger::types::{
    b64, CommitOutcome, Endorsement, GatewayError, GatewayResult, Orderer, Target,
    SUCCESS_STATUS,
};
use crate::observability::metrics;
use crate::resilience::{with_deadline, Deadline};

/// Fabric validation code for a valid transaction.
pub const TX_VALID: i32 = 0;

/// Signed transaction as handed to the orderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(with = "b64")]
    pub payload: Vec<u8>,
    #[serde(with = "b64")]
    pub signature: Vec<u8>,
}

impl Envelope {
    pub fn decode_payload(&self) -> GatewayResult<TransactionPayload> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| GatewayError::Decode(format!("Malformed envelope payload: {}", e)))
    }
}

/// Envelope contents: the proposal plus the endorsements collected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub channel_id: String,
    pub tx_id: String,
    #[serde(with = "b64")]
    pub proposal_bytes: Vec<u8>,
    #[serde(with = "b64")]
    pub response_payload: Vec<u8>,
    pub endorsements: Vec<Endorsement>,
}

/// Ledger verdict on a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    Valid { block_number: u64 },
    Invalid { code: i32 },
}

/// Source of commit notifications for submitted transactions.
#[async_trait]
pub trait CommitNotifier: Send + Sync {
    /// Wait until `tx_id` is committed or invalidated on `channel_id`.
    ///
    /// Callers bound the wait; implementations may run until dropped.
    async fn wait_for_commit(&self, channel_id: &str, tx_id: &str) -> GatewayResult<CommitStatus>;
}

/// Hands endorsed transactions to the ordering service.
#[derive(Clone)]
pub struct TransactionSubmitter {
    transport: Arc<dyn PeerTransport>,
    /// Broadcast timeout.
    timeout: Duration,
    notifier: Option<Arc<dyn CommitNotifier>>,
    commit_timeout: Duration,
}

impl TransactionSubmitter {
    pub fn new(transport: Arc<dyn PeerTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            notifier: None,
            commit_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_notifier(
        mut self,
        notifier: Arc<dyn CommitNotifier>,
        commit_timeout: Duration,
    ) -> Self {
        self.notifier = Some(notifier);
        self.commit_timeout = commit_timeout;
        self
    }

    /// Build the envelope for an endorsed proposal, signed by its creator.
    pub fn assemble(&self, result: &EndorsementResult) -> GatewayResult<Envelope> {
        let proposal = &result.proposal;
        let signed = proposal.sign()?;

        let tx = TransactionPayload {
            channel_id: proposal.context.channel_id().to_string(),
            tx_id: proposal.tx_id().to_string(),
            proposal_bytes: signed.proposal_bytes,
            response_payload: result.agreed_payload().to_vec(),
            endorsements: result
                .responses
                .iter()
                .filter_map(|r| r.endorsement.clone())
                .collect(),
        };

        let payload = serde_json::to_vec(&tx)
            .map_err(|e| GatewayError::Decode(format!("Failed to encode transaction: {}", e)))?;
        let signature = proposal.context.identity().sign(&payload);
        Ok(Envelope { payload, signature })
    }

    /// Submit an accepted endorsement result to `orderer`.
    ///
    /// Transport errors and cancellation are returned as `Err`; orderer
    /// verdicts, including rejection and timeout, come back as outcomes.
    pub async fn submit(
        &self,
        result: &EndorsementResult,
        orderer: &Orderer,
        cancel: &CancellationToken,
    ) -> GatewayResult<CommitOutcome> {
        let tx_id = result.tx_id().to_string();
        let kind = result.proposal.kind;

        if !result.accepted {
            return Err(GatewayError::InvalidState(format!(
                "Transaction {} was not endorsed and cannot be submitted",
                tx_id
            )));
        }
        if !kind.requires_ordering() {
            return Err(GatewayError::InvalidState(format!(
                "{} transactions are not sent to the orderer",
                kind
            )));
        }

        let envelope = self.assemble(result)?;
        tracing::info!(tx_id = %tx_id, orderer = %orderer.name, "Broadcasting transaction");

        let outcome = match with_deadline(
            self.timeout,
            cancel,
            self.transport.broadcast(orderer, &envelope),
        )
        .await
        {
            Deadline::Completed(Ok(resp)) if resp.status == SUCCESS_STATUS => {
                tracing::info!(tx_id = %tx_id, "Orderer accepted transaction");
                CommitOutcome::AcceptedByOrderer { tx_id }
            }
            Deadline::Completed(Ok(resp)) => {
                tracing::warn!(
                    tx_id = %tx_id,
                    status = resp.status,
                    info = %resp.info,
                    "Orderer rejected transaction"
                );
                CommitOutcome::Rejected {
                    tx_id,
                    reason: format!("orderer status {}: {}", resp.status, resp.info),
                }
            }
            Deadline::Completed(Err(e)) => {
                tracing::error!(tx_id = %tx_id, error = %e, "Broadcast failed");
                metrics::record_submission("unreachable");
                return Err(e);
            }
            Deadline::TimedOut => {
                tracing::warn!(tx_id = %tx_id, timeout = ?self.timeout, "Broadcast timed out");
                CommitOutcome::TimedOut { tx_id }
            }
            Deadline::Cancelled => {
                metrics::record_submission("cancelled");
                return Err(GatewayError::Cancelled);
            }
        };

        let outcome = match &self.notifier {
            Some(notifier) if matches!(outcome, CommitOutcome::AcceptedByOrderer { .. }) => {
                self.await_commit(notifier.as_ref(), result, outcome, cancel)
                    .await?
            }
            _ => outcome,
        };

        metrics::record_submission(outcome_label(&outcome));
        Ok(outcome)
    }

    async fn await_commit(
        &self,
        notifier: &dyn CommitNotifier,
        result: &EndorsementResult,
        accepted: CommitOutcome,
        cancel: &CancellationToken,
    ) -> GatewayResult<CommitOutcome> {
        let tx_id = result.tx_id().to_string();
        let channel_id = result.proposal.context.channel_id();

        match with_deadline(
            self.commit_timeout,
            cancel,
            notifier.wait_for_commit(channel_id, &tx_id),
        )
        .await
        {
            Deadline::Completed(Ok(CommitStatus::Valid { block_number })) => {
                tracing::info!(tx_id = %tx_id, block_number, "Transaction committed");
                Ok(CommitOutcome::Committed {
                    tx_id,
                    block_number,
                })
            }
            Deadline::Completed(Ok(CommitStatus::Invalid { code })) => {
                tracing::warn!(tx_id = %tx_id, code, "Transaction invalidated by committers");
                Ok(CommitOutcome::Rejected {
                    tx_id,
                    reason: format!("invalidated by committing peers: code {}", code),
                })
            }
            Deadline::Completed(Err(e)) => {
                tracing::warn!(tx_id = %tx_id, error = %e, "Commit notification unavailable");
                Ok(accepted)
            }
            Deadline::TimedOut => {
                tracing::warn!(
                    tx_id = %tx_id,
                    timeout = ?self.commit_timeout,
                    "No commit notification before deadline; orderer accepted"
                );
                Ok(accepted)
            }
            Deadline::Cancelled => Err(GatewayError::Cancelled),
        }
    }
}

fn outcome_label(outcome: &CommitOutcome) -> &'static str {
    match outcome {
        CommitOutcome::AcceptedByOrderer { .. } => "accepted",
        CommitOutcome::Committed { .. } => "committed",
        CommitOutcome::Rejected { .. } => "rejected",
        CommitOutcome::TimedOut { .. } => "timeout",
    }
}

/// Commit notifier that polls a peer's ledger for the transaction.
///
/// Only a not-found answer is retried. Any other query failure ends the
/// wait with that error.
pub struct PollingCommitNotifier {
    engine: LedgerQueryEngine,
    peer: Target,
    identity: Identity,
    poll_interval: Duration,
}

impl PollingCommitNotifier {
    pub fn new(
        engine: LedgerQueryEngine,
        peer: Target,
        identity: Identity,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            peer,
            identity,
            poll_interval,
        }
    }
}

#[async_trait]
impl CommitNotifier for PollingCommitNotifier {
    async fn wait_for_commit(&self, channel_id: &str, tx_id: &str) -> GatewayResult<CommitStatus> {
        let mut ticker = interval(self.poll_interval);
        let never = CancellationToken::new();

        loop {
            ticker.tick().await;

            let found = self
                .engine
                .find_transaction(&self.peer, &self.identity, channel_id, tx_id, &never)
                .await?;

            match found {
                Some(tx) if tx.validation_code == TX_VALID => {
                    return Ok(CommitStatus::Valid {
                        block_number: tx.block_number.unwrap_or_default(),
                    });
                }
                Some(tx) => {
                    return Ok(CommitStatus::Invalid {
                        code: tx.validation_code,
                    });
                }
                None => tracing::debug!(tx_id = %tx_id, "Transaction not yet on ledger"),
            }
        }
    }
}
