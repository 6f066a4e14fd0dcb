//! Endorsement validation.
//!
//! Acceptance is unanimous: every requested target must return status 200,
//! and for instantiate/invoke every payload must equal the first good one
//! byte for byte. Anything less rejects the whole proposal. Validation is
//! pure and performs no I/O.

use crate::ledger::proposal::Proposal;
use crate::ledger::types::{GatewayError, GatewayResult, ProposalResponse, SUCCESS_STATUS};
use crate::observability::metrics;

/// Verdict over the responses collected for one proposal.
#[derive(Debug, Clone)]
pub struct EndorsementResult {
    pub accepted: bool,
    pub proposal: Proposal,
    /// Responses in target order.
    pub responses: Vec<ProposalResponse>,
    /// First offending target, when rejected.
    pub reason: Option<GatewayError>,
}

impl EndorsementResult {
    pub fn tx_id(&self) -> &str {
        self.proposal.tx_id()
    }

    /// Turn a rejection into its error.
    pub fn into_accepted(self) -> GatewayResult<Self> {
        match (self.accepted, &self.reason) {
            (true, _) => Ok(self),
            (false, Some(reason)) => Err(reason.clone()),
            (false, None) => Err(GatewayError::InvalidState(format!(
                "transaction {} rejected without a reason",
                self.tx_id()
            ))),
        }
    }

    /// Payload the endorsers agreed on (empty if none).
    pub fn agreed_payload(&self) -> &[u8] {
        self.responses
            .iter()
            .find(|r| r.is_success())
            .map(|r| r.payload.as_slice())
            .unwrap_or_default()
    }
}

/// Decide whether `responses` unanimously endorse `proposal`.
pub fn validate(proposal: Proposal, responses: Vec<ProposalResponse>) -> EndorsementResult {
    let reason = first_offence(&proposal, &responses);
    let accepted = reason.is_none();

    let kind = proposal.kind.as_str();
    match &reason {
        None => {
            tracing::info!(
                tx_id = %proposal.tx_id(),
                kind = kind,
                endorsements = responses.len(),
                "Proposal endorsed by all targets"
            );
            metrics::record_endorsement(kind, "accepted");
        }
        Some(reason) => {
            tracing::warn!(
                tx_id = %proposal.tx_id(),
                kind = kind,
                reason = %reason,
                "Proposal rejected"
            );
            metrics::record_endorsement(kind, reason.kind());
        }
    }

    EndorsementResult {
        accepted,
        proposal,
        responses,
        reason,
    }
}

fn first_offence(proposal: &Proposal, responses: &[ProposalResponse]) -> Option<GatewayError> {
    let targets = proposal.unique_targets();
    if targets.is_empty() {
        return Some(GatewayError::NoTargets);
    }

    let mut reference: Option<&ProposalResponse> = None;
    for peer in &targets {
        let Some(resp) = responses.iter().find(|r| &r.target == peer) else {
            return Some(GatewayError::NetworkUnreachable {
                target: peer.to_string(),
                reason: "no response collected".to_string(),
            });
        };

        if let Some(failure) = &resp.failure {
            return Some(GatewayError::NetworkUnreachable {
                target: peer.to_string(),
                reason: failure.to_string(),
            });
        }

        if resp.status != SUCCESS_STATUS {
            return Some(GatewayError::ProposalRejected {
                target: peer.to_string(),
                status: resp.status,
                message: resp.message.clone(),
            });
        }

        if proposal.kind.requires_payload_agreement() {
            match reference {
                None => reference = Some(resp),
                Some(first) if first.payload != resp.payload => {
                    return Some(GatewayError::EndorsementMismatch {
                        target: peer.to_string(),
                        reference: first.target.to_string(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    None
}
