//! Public gateway verbs.
//!
//! # Data Flow
//! ```text
//! install ─▶ context ─▶ proposal ─▶ orchestrator ─▶ validator ─▶ EndorsementResult
//! instantiate/invoke ─▶ (same) ─▶ validator ─▶ submitter ─▶ CommitOutcome
//! queries ─▶ identifier parsing ─▶ resolve peer ─▶ query engine ─▶ typed result
//! ```
//!
//! Every verb takes its identity, channel, targets and cancellation token as
//! parameters. The gateway keeps no per-user or per-call state between calls,
//! so cancelling one call never affects another.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::identity::Identity;
use crate::ledger::args::{args_to_bytes, decode_block_hash, parse_block_number, validate_tx_id};
use crate::ledger::context::TransactionContext;
use crate::ledger::endorsement::{validate, EndorsementResult};
use crate::ledger::orchestrator::ProposalOrchestrator;
use crate::ledger::proposal::Proposal;
use crate::ledger::query::{
    Block, ChainInfo, ChaincodeSummary, ChaincodeValue, ChannelSummary, LedgerQueryEngine,
    ProcessedTransaction,
};
use crate::ledger::submitter::{CommitNotifier, TransactionSubmitter};
use crate::ledger::transport::PeerTransport;
use crate::ledger::types::{
    ChaincodeDescriptor, CommitOutcome, GatewayError, GatewayResult, PeerRef, ProposalKind,
    TxLifecycle, TxState,
};
use crate::topology::TopologyResolver;

/// Entry point for chaincode lifecycle, transactions and ledger queries.
#[derive(Clone)]
pub struct Gateway {
    topology: Arc<dyn TopologyResolver>,
    orchestrator: ProposalOrchestrator,
    submitter: TransactionSubmitter,
    queries: LedgerQueryEngine,
    invoke_function: String,
    commit_timeout: Duration,
}

impl Gateway {
    pub fn new(
        config: &GatewayConfig,
        topology: Arc<dyn TopologyResolver>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        let timeouts = &config.timeouts;
        Self {
            orchestrator: ProposalOrchestrator::new(
                topology.clone(),
                transport.clone(),
                timeouts.proposal(),
            ),
            submitter: TransactionSubmitter::new(transport.clone(), timeouts.orderer()),
            queries: LedgerQueryEngine::new(
                transport,
                timeouts.query(),
                config.chaincode.invoke_function.clone(),
            ),
            topology,
            invoke_function: config.chaincode.invoke_function.clone(),
            commit_timeout: timeouts.commit(),
        }
    }

    /// Follow orderer-accepted transactions until the ledger commits them.
    pub fn with_commit_notifier(mut self, notifier: Arc<dyn CommitNotifier>) -> Self {
        self.submitter = self.submitter.with_notifier(notifier, self.commit_timeout);
        self
    }

    /// Install chaincode on `targets`. Terminal at endorsement.
    pub async fn install_chaincode(
        &self,
        targets: Vec<PeerRef>,
        chaincode: ChaincodeDescriptor,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<EndorsementResult> {
        let span = tracing::info_span!(
            "install",
            op_id = %Uuid::new_v4(),
            chaincode = %chaincode.name,
            version = %chaincode.version
        );

        async move {
            if chaincode.path.as_deref().map_or(true, str::is_empty) {
                return Err(GatewayError::Decode(format!(
                    "Chaincode '{}' has no source path to install",
                    chaincode.name
                )));
            }

            let context = TransactionContext::build("", identity)?;
            let proposal = Proposal::new(ProposalKind::Install, targets, chaincode, context);
            let (result, _) = self.endorse(proposal, cancel).await?;
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Instantiate chaincode on `channel_id` and submit it for ordering.
    pub async fn instantiate_chaincode(
        &self,
        targets: Vec<PeerRef>,
        channel_id: &str,
        chaincode: ChaincodeDescriptor,
        function: &str,
        args: &[String],
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<CommitOutcome> {
        let span = tracing::info_span!(
            "instantiate",
            op_id = %Uuid::new_v4(),
            channel = %channel_id,
            chaincode = %chaincode.name,
            version = %chaincode.version
        );

        async move {
            let context = TransactionContext::build(channel_id, identity)?;
            let proposal = Proposal::new(ProposalKind::Instantiate, targets, chaincode, context)
                .with_call(function, args_to_bytes(args));
            self.transact(proposal, cancel).await
        }
        .instrument(span)
        .await
    }

    /// Invoke a chaincode transaction and submit it for ordering.
    pub async fn invoke_chaincode(
        &self,
        targets: Vec<PeerRef>,
        channel_id: &str,
        chaincode: ChaincodeDescriptor,
        args: &[String],
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<CommitOutcome> {
        let span = tracing::info_span!(
            "invoke",
            op_id = %Uuid::new_v4(),
            channel = %channel_id,
            chaincode = %chaincode.name
        );

        async move {
            let context = TransactionContext::build(channel_id, identity)?;
            let proposal = Proposal::new(ProposalKind::Invoke, targets, chaincode, context)
                .with_call(self.invoke_function.as_str(), args_to_bytes(args));
            self.transact(proposal, cancel).await
        }
        .instrument(span)
        .await
    }

    /// Evaluate a chaincode on one peer without ordering.
    pub async fn query_chaincode(
        &self,
        peer: &PeerRef,
        channel_id: &str,
        chaincode: ChaincodeDescriptor,
        args: &[String],
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<ChaincodeValue> {
        let span = query_span("query_chaincode", peer, channel_id);
        async move {
            let target = self.topology.resolve_peer(peer)?;
            self.queries
                .query_chaincode(
                    &target,
                    identity,
                    channel_id,
                    chaincode,
                    args_to_bytes(args),
                    cancel,
                )
                .await
        }
        .instrument(span)
        .await
    }

    /// Fetch a block by its number, given as a decimal string.
    pub async fn get_block_by_number(
        &self,
        peer: &PeerRef,
        channel_id: &str,
        block_id: &str,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<Block> {
        let span = query_span("get_block_by_number", peer, channel_id);
        async move {
            let number = parse_block_number(block_id)?;
            let target = self.topology.resolve_peer(peer)?;
            self.queries
                .block_by_number(&target, identity, channel_id, number, cancel)
                .await
        }
        .instrument(span)
        .await
    }

    /// Fetch a block by its hex-encoded hash.
    pub async fn get_block_by_hash(
        &self,
        peer: &PeerRef,
        channel_id: &str,
        block_hash: &str,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<Block> {
        let span = query_span("get_block_by_hash", peer, channel_id);
        async move {
            let hash = decode_block_hash(block_hash)?;
            let target = self.topology.resolve_peer(peer)?;
            self.queries
                .block_by_hash(&target, identity, channel_id, &hash, cancel)
                .await
        }
        .instrument(span)
        .await
    }

    pub async fn get_transaction_by_id(
        &self,
        peer: &PeerRef,
        channel_id: &str,
        tx_id: &str,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<ProcessedTransaction> {
        let span = query_span("get_transaction_by_id", peer, channel_id);
        async move {
            let tx_id = validate_tx_id(tx_id)?;
            let target = self.topology.resolve_peer(peer)?;
            self.queries
                .transaction_by_id(&target, identity, channel_id, tx_id, cancel)
                .await
        }
        .instrument(span)
        .await
    }

    pub async fn get_chain_info(
        &self,
        peer: &PeerRef,
        channel_id: &str,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<ChainInfo> {
        let span = query_span("get_chain_info", peer, channel_id);
        async move {
            let target = self.topology.resolve_peer(peer)?;
            self.queries.chain_info(&target, identity, channel_id, cancel).await
        }
        .instrument(span)
        .await
    }

    pub async fn list_installed_chaincodes(
        &self,
        peer: &PeerRef,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<Vec<ChaincodeSummary>> {
        let span = query_span("list_installed_chaincodes", peer, "");
        async move {
            let target = self.topology.resolve_peer(peer)?;
            self.queries.installed_chaincodes(&target, identity, cancel).await
        }
        .instrument(span)
        .await
    }

    pub async fn list_instantiated_chaincodes(
        &self,
        peer: &PeerRef,
        channel_id: &str,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<Vec<ChaincodeSummary>> {
        let span = query_span("list_instantiated_chaincodes", peer, channel_id);
        async move {
            let target = self.topology.resolve_peer(peer)?;
            self.queries
                .instantiated_chaincodes(&target, identity, channel_id, cancel)
                .await
        }
        .instrument(span)
        .await
    }

    pub async fn list_channels(
        &self,
        peer: &PeerRef,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<Vec<ChannelSummary>> {
        let span = query_span("list_channels", peer, "");
        async move {
            let target = self.topology.resolve_peer(peer)?;
            self.queries.channels(&target, identity, cancel).await
        }
        .instrument(span)
        .await
    }

    /// Propose and validate. Rejections come back as their reason.
    async fn endorse(
        &self,
        proposal: Proposal,
        cancel: &CancellationToken,
    ) -> GatewayResult<(EndorsementResult, TxLifecycle)> {
        let mut lifecycle = TxLifecycle::new(proposal.tx_id(), proposal.kind);
        lifecycle.advance(TxState::Proposed)?;

        let responses = self.orchestrator.send(&proposal, cancel).await?;
        let result = validate(proposal, responses);

        if result.accepted {
            lifecycle.advance(TxState::Endorsed)?;
        } else {
            lifecycle.advance(TxState::Rejected)?;
        }
        Ok((result.into_accepted()?, lifecycle))
    }

    /// Propose, validate and submit an ordering transaction.
    async fn transact(
        &self,
        proposal: Proposal,
        cancel: &CancellationToken,
    ) -> GatewayResult<CommitOutcome> {
        let orderer = self.topology.resolve_orderer(proposal.context.channel_id())?;
        let (result, mut lifecycle) = self.endorse(proposal, cancel).await?;

        lifecycle.advance(TxState::Submitted)?;
        let outcome = match self.submitter.submit(&result, &orderer, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                lifecycle.advance(TxState::SubmissionFailed)?;
                return Err(e);
            }
        };

        match &outcome {
            CommitOutcome::AcceptedByOrderer { .. } => {
                lifecycle.advance(TxState::AcceptedByOrderer)?;
            }
            CommitOutcome::Committed { .. } => {
                lifecycle.advance(TxState::AcceptedByOrderer)?;
                lifecycle.advance(TxState::Committed)?;
            }
            CommitOutcome::Rejected { .. } | CommitOutcome::TimedOut { .. } => {
                lifecycle.advance(TxState::SubmissionFailed)?;
            }
        }

        outcome.into_result()
    }
}

fn query_span(verb: &'static str, peer: &PeerRef, channel_id: &str) -> tracing::Span {
    tracing::info_span!(
        "query",
        verb = verb,
        op_id = %Uuid::new_v4(),
        peer = %peer,
        channel = %channel_id
    )
}
