//! Single-peer read-only ledger queries.
//!
//! # Responsibilities
//! - Evaluate chaincode functions without ordering
//! - Look up blocks, transactions and chain metadata through `qscc`
//! - List installed/instantiated chaincodes (`lscc`) and joined channels (`cscc`)
//! - Normalize system-chaincode payloads into typed records
//!
//! Every query is one read-only proposal to one peer. Nothing here mutates
//! ledger or client state.

use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::identity::Identity;
use crate::ledger::context::TransactionContext;
use crate::ledger::proposal::Proposal;
use crate::ledger::transport::PeerTransport;
use crate::ledger::types::{
    b64, ChaincodeDescriptor, GatewayError, GatewayResult, ProposalKind, Target, SUCCESS_STATUS,
};
use crate::observability::metrics;
use crate::resilience::{with_deadline, Deadline};

/// Query system chaincode.
pub const QSCC: &str = "qscc";
/// Lifecycle system chaincode.
pub const LSCC: &str = "lscc";
/// Configuration system chaincode.
pub const CSCC: &str = "cscc";

/// Status a peer reports when the requested ledger entry does not exist.
pub const NOT_FOUND_STATUS: u16 = 404;

/// Raw chaincode query result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChaincodeValue(pub Vec<u8>);

impl ChaincodeValue {
    /// True when the peer returned no payload.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl Serialize for ChaincodeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(&self.0) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => b64::serialize(&self.0, serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    #[serde(with = "b64")]
    pub previous_hash: Vec<u8>,
    #[serde(with = "b64")]
    pub data_hash: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Ids of the transactions carried in the block.
    #[serde(default)]
    pub transactions: Vec<String>,
}

/// A transaction as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    pub tx_id: String,
    /// Fabric validation code; 0 means valid.
    pub validation_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub height: u64,
    #[serde(with = "b64")]
    pub current_block_hash: Vec<u8>,
    #[serde(with = "b64")]
    pub previous_block_hash: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeSummary {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    #[serde(rename = "channelId", alias = "channel_id")]
    pub channel_id: String,
}

#[derive(Deserialize)]
struct ChaincodeListing {
    #[serde(default)]
    chaincodes: Vec<ChaincodeSummary>,
}

#[derive(Deserialize)]
struct ChannelListing {
    #[serde(default)]
    channels: Vec<ChannelSummary>,
}

/// Result of any ledger query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Value(ChaincodeValue),
    Block(Block),
    Transaction(ProcessedTransaction),
    ChainInfo(ChainInfo),
    Chaincodes(Vec<ChaincodeSummary>),
    Channels(Vec<ChannelSummary>),
}

impl From<ChaincodeValue> for QueryResult {
    fn from(value: ChaincodeValue) -> Self {
        QueryResult::Value(value)
    }
}

impl From<Block> for QueryResult {
    fn from(block: Block) -> Self {
        QueryResult::Block(block)
    }
}

impl From<ProcessedTransaction> for QueryResult {
    fn from(tx: ProcessedTransaction) -> Self {
        QueryResult::Transaction(tx)
    }
}

impl From<ChainInfo> for QueryResult {
    fn from(info: ChainInfo) -> Self {
        QueryResult::ChainInfo(info)
    }
}

impl From<Vec<ChaincodeSummary>> for QueryResult {
    fn from(list: Vec<ChaincodeSummary>) -> Self {
        QueryResult::Chaincodes(list)
    }
}

impl From<Vec<ChannelSummary>> for QueryResult {
    fn from(list: Vec<ChannelSummary>) -> Self {
        QueryResult::Channels(list)
    }
}

/// One read-only proposal: which chaincode function to call and how.
struct Call {
    /// Metric and log label.
    kind: &'static str,
    chaincode: ChaincodeDescriptor,
    function: String,
    args: Vec<Vec<u8>>,
}

impl Call {
    fn system(kind: &'static str, name: &str, function: &str, args: Vec<Vec<u8>>) -> Self {
        Self {
            kind,
            chaincode: ChaincodeDescriptor::new(name, ""),
            function: function.to_string(),
            args,
        }
    }
}

/// Issues read-only proposals to a single peer.
#[derive(Clone)]
pub struct LedgerQueryEngine {
    transport: Arc<dyn PeerTransport>,
    timeout: Duration,
    invoke_function: String,
}

impl LedgerQueryEngine {
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        timeout: Duration,
        invoke_function: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            timeout,
            invoke_function: invoke_function.into(),
        }
    }

    /// Evaluate a chaincode with `args`. An empty payload is an empty value.
    pub async fn query_chaincode(
        &self,
        peer: &Target,
        identity: &Identity,
        channel_id: &str,
        chaincode: ChaincodeDescriptor,
        args: Vec<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> GatewayResult<ChaincodeValue> {
        let call = Call {
            kind: "chaincode",
            chaincode,
            function: self.invoke_function.clone(),
            args,
        };
        let payload = self.evaluate(peer, identity, channel_id, call, cancel).await?;
        let payload = required(peer, "chaincode result", payload)?;
        if payload.is_empty() {
            tracing::info!(peer = %peer, channel = %channel_id, "Query returned no payload");
        }
        Ok(ChaincodeValue(payload))
    }

    pub async fn block_by_number(
        &self,
        peer: &Target,
        identity: &Identity,
        channel_id: &str,
        number: u64,
        cancel: &CancellationToken,
    ) -> GatewayResult<Block> {
        let args = vec![channel_id.as_bytes().to_vec(), number.to_string().into_bytes()];
        let call = Call::system("block", QSCC, "GetBlockByNumber", args);
        let payload = self.evaluate(peer, identity, channel_id, call, cancel).await?;
        decode(peer, "block", &required(peer, "block", payload)?)
    }

    pub async fn block_by_hash(
        &self,
        peer: &Target,
        identity: &Identity,
        channel_id: &str,
        hash: &[u8],
        cancel: &CancellationToken,
    ) -> GatewayResult<Block> {
        let args = vec![channel_id.as_bytes().to_vec(), hash.to_vec()];
        let call = Call::system("block", QSCC, "GetBlockByHash", args);
        let payload = self.evaluate(peer, identity, channel_id, call, cancel).await?;
        decode(peer, "block", &required(peer, "block", payload)?)
    }

    pub async fn transaction_by_id(
        &self,
        peer: &Target,
        identity: &Identity,
        channel_id: &str,
        tx_id: &str,
        cancel: &CancellationToken,
    ) -> GatewayResult<ProcessedTransaction> {
        self.find_transaction(peer, identity, channel_id, tx_id, cancel)
            .await?
            .ok_or_else(|| GatewayError::QueryFailure {
                target: peer.to_string(),
                reason: format!("transaction {} not found", tx_id),
            })
    }

    /// Like [`Self::transaction_by_id`], but a transaction the peer does not
    /// have yet is `Ok(None)` rather than an error.
    pub async fn find_transaction(
        &self,
        peer: &Target,
        identity: &Identity,
        channel_id: &str,
        tx_id: &str,
        cancel: &CancellationToken,
    ) -> GatewayResult<Option<ProcessedTransaction>> {
        let args = vec![channel_id.as_bytes().to_vec(), tx_id.as_bytes().to_vec()];
        let call = Call::system("transaction", QSCC, "GetTransactionByID", args);
        match self.evaluate(peer, identity, channel_id, call, cancel).await? {
            Some(payload) => decode(peer, "transaction", &payload).map(Some),
            None => Ok(None),
        }
    }

    pub async fn chain_info(
        &self,
        peer: &Target,
        identity: &Identity,
        channel_id: &str,
        cancel: &CancellationToken,
    ) -> GatewayResult<ChainInfo> {
        let args = vec![channel_id.as_bytes().to_vec()];
        let call = Call::system("chain_info", QSCC, "GetChainInfo", args);
        let payload = self.evaluate(peer, identity, channel_id, call, cancel).await?;
        decode(peer, "chain info", &required(peer, "chain info", payload)?)
    }

    /// Chaincodes installed on the peer's filesystem.
    pub async fn installed_chaincodes(
        &self,
        peer: &Target,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<Vec<ChaincodeSummary>> {
        let call = Call::system("installed", LSCC, "getinstalledchaincodes", Vec::new());
        let payload = self.evaluate(peer, identity, "", call, cancel).await?;
        let payload = required(peer, "chaincode listing", payload)?;
        Ok(decode::<ChaincodeListing>(peer, "chaincode listing", &payload)?.chaincodes)
    }

    /// Chaincodes instantiated on `channel_id`.
    pub async fn instantiated_chaincodes(
        &self,
        peer: &Target,
        identity: &Identity,
        channel_id: &str,
        cancel: &CancellationToken,
    ) -> GatewayResult<Vec<ChaincodeSummary>> {
        let call = Call::system("instantiated", LSCC, "getchaincodes", Vec::new());
        let payload = self.evaluate(peer, identity, channel_id, call, cancel).await?;
        let payload = required(peer, "chaincode listing", payload)?;
        Ok(decode::<ChaincodeListing>(peer, "chaincode listing", &payload)?.chaincodes)
    }

    /// Channels the peer has joined.
    pub async fn channels(
        &self,
        peer: &Target,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> GatewayResult<Vec<ChannelSummary>> {
        let call = Call::system("channels", CSCC, "GetChannels", Vec::new());
        let payload = self.evaluate(peer, identity, "", call, cancel).await?;
        let payload = required(peer, "channel listing", payload)?;
        Ok(decode::<ChannelListing>(peer, "channel listing", &payload)?.channels)
    }

    /// Send `call` to `peer`. `Ok(None)` means the peer reported not found.
    async fn evaluate(
        &self,
        peer: &Target,
        identity: &Identity,
        channel_id: &str,
        call: Call,
        cancel: &CancellationToken,
    ) -> GatewayResult<Option<Vec<u8>>> {
        let Call {
            kind,
            chaincode,
            function,
            args,
        } = call;

        let context = TransactionContext::build(channel_id, identity)?;
        let proposal = Proposal::new(ProposalKind::Query, vec![peer.peer_ref()], chaincode, context)
            .with_call(function.as_str(), args);
        let signed = proposal.sign()?;

        tracing::debug!(
            peer = %peer,
            channel = %channel_id,
            chaincode = %proposal.chaincode.name,
            function = %function,
            "Evaluating query"
        );

        let dispatch = self.transport.process_proposal(peer, &signed);
        let result = match with_deadline(self.timeout, cancel, dispatch).await {
            Deadline::Completed(Ok(resp)) if resp.status == SUCCESS_STATUS => {
                Ok(Some(resp.payload))
            }
            Deadline::Completed(Ok(resp)) if resp.status == NOT_FOUND_STATUS => {
                tracing::debug!(peer = %peer, kind = kind, "Ledger entry not found");
                Ok(None)
            }
            Deadline::Completed(Ok(resp)) => Err(GatewayError::QueryFailure {
                target: peer.to_string(),
                reason: format!("status {}: {}", resp.status, resp.message),
            }),
            Deadline::Completed(Err(e)) => Err(e),
            Deadline::TimedOut => Err(GatewayError::NetworkUnreachable {
                target: peer.to_string(),
                reason: format!("no answer within {:?}", self.timeout),
            }),
            Deadline::Cancelled => Err(GatewayError::Cancelled),
        };

        if let Err(e) = &result {
            tracing::warn!(peer = %peer, kind = kind, error = %e, "Query failed");
        }
        metrics::record_query(kind, result.is_ok());
        result
    }
}

fn required(peer: &Target, what: &str, payload: Option<Vec<u8>>) -> GatewayResult<Vec<u8>> {
    payload.ok_or_else(|| GatewayError::QueryFailure {
        target: peer.to_string(),
        reason: format!("{} not found", what),
    })
}

fn decode<T>(peer: &Target, what: &str, payload: &[u8]) -> GatewayResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_slice(payload).map_err(|e| GatewayError::QueryFailure {
        target: peer.to_string(),
        reason: format!("malformed {} payload: {}", what, e),
    })
}
