//! Proposal fan-out.
//!
//! # Responsibilities
//! - Resolve every requested target through the topology
//! - Dispatch the signed proposal to all resolved targets concurrently
//! - Wait for every dispatch to finish, time out or be cancelled
//! - Fold per-target failures into synthetic responses
//!
//! # Design Decisions
//! - Wait-for-all barrier, not wait-for-first
//! - Each target has its own timeout; total time is bounded by the slowest one
//! - Cancellation drops every outstanding dispatch (closing its connection)

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::ledger::proposal::{Proposal, SignedProposal};
use crate::ledger::transport::PeerTransport;
use crate::ledger::types::{DispatchFailure, GatewayError, GatewayResult, PeerRef, ProposalResponse};
use crate::observability::metrics;
use crate::resilience::{with_deadline, Deadline};
use crate::topology::TopologyResolver;

/// Sends proposals to endorsers and collects their responses.
#[derive(Clone)]
pub struct ProposalOrchestrator {
    topology: Arc<dyn TopologyResolver>,
    transport: Arc<dyn PeerTransport>,
    /// Per-target dispatch timeout.
    timeout: Duration,
}

impl ProposalOrchestrator {
    pub fn new(
        topology: Arc<dyn TopologyResolver>,
        transport: Arc<dyn PeerTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            topology,
            transport,
            timeout,
        }
    }

    /// Fan `proposal` out and return one response per unique target, in
    /// request order.
    ///
    /// Fails only when the target set is empty, the proposal cannot be
    /// signed, or `cancel` fires before every dispatch has finished.
    pub async fn send(
        &self,
        proposal: &Proposal,
        cancel: &CancellationToken,
    ) -> GatewayResult<Vec<ProposalResponse>> {
        let targets = proposal.unique_targets();
        if targets.is_empty() {
            return Err(GatewayError::NoTargets);
        }

        let signed = proposal.sign()?;
        tracing::info!(
            tx_id = %proposal.tx_id(),
            kind = %proposal.kind,
            targets = targets.len(),
            "Sending proposal"
        );

        let started = Instant::now();
        let responses = join_all(
            targets
                .into_iter()
                .map(|peer| self.dispatch(peer, &signed, cancel)),
        )
        .await;
        metrics::record_fanout_duration(proposal.kind.as_str(), started.elapsed());

        if cancel.is_cancelled() {
            tracing::warn!(tx_id = %proposal.tx_id(), "Proposal fan-out cancelled");
            return Err(GatewayError::Cancelled);
        }

        Ok(responses)
    }

    async fn dispatch(
        &self,
        peer: PeerRef,
        signed: &SignedProposal,
        cancel: &CancellationToken,
    ) -> ProposalResponse {
        let target = match self.topology.resolve_peer(&peer) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Cannot resolve target");
                metrics::record_dispatch("unresolved");
                return ProposalResponse::failed(peer, DispatchFailure::Unresolved(e.to_string()));
            }
        };

        match with_deadline(
            self.timeout,
            cancel,
            self.transport.process_proposal(&target, signed),
        )
        .await
        {
            Deadline::Completed(Ok(resp)) => {
                tracing::debug!(peer = %peer, status = resp.status, "Proposal response received");
                metrics::record_dispatch("answered");
                ProposalResponse {
                    target: peer,
                    status: resp.status,
                    message: resp.message,
                    payload: resp.payload,
                    endorsement: resp.endorsement,
                    failure: None,
                }
            }
            Deadline::Completed(Err(e)) => {
                tracing::warn!(peer = %peer, error = %e, "Proposal dispatch failed");
                metrics::record_dispatch("unreachable");
                ProposalResponse::failed(peer, DispatchFailure::Unreachable(e.to_string()))
            }
            Deadline::TimedOut => {
                tracing::warn!(
                    peer = %peer,
                    timeout = ?self.timeout,
                    "Proposal dispatch timed out"
                );
                metrics::record_dispatch("timeout");
                ProposalResponse::failed(peer, DispatchFailure::TimedOut(self.timeout))
            }
            Deadline::Cancelled => {
                metrics::record_dispatch("cancelled");
                ProposalResponse::failed(peer, DispatchFailure::Cancelled)
            }
        }
    }
}
