//! chaincode-gateway CLI
//!
//! Runs one gateway verb per invocation and prints a JSON result object:
//!
//! ```text
//! {"success": true,  "result": ...}
//! {"success": false, "kind": "EndorsementMismatch", "message": "..."}
//! ```
//!
//! Chaincode arguments arrive as a base64-encoded JSON array of strings
//! (`--args`). Ctrl-C cancels the operation in flight.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use chaincode_gateway::config::{load_config, GatewayConfig};
use chaincode_gateway::identity::{IdentityProvider, KeystoreIdentityProvider};
use chaincode_gateway::ledger::args::decode_args;
use chaincode_gateway::ledger::{
    ChaincodeDescriptor, Gateway, GatewayError, GatewayResult, HttpTransport, PeerRef, QueryResult,
};
use chaincode_gateway::observability::logging;
use chaincode_gateway::topology::StaticTopology;

#[derive(Parser)]
#[command(name = "chaincode-gateway")]
#[command(about = "Install, invoke and query chaincode on a permissioned ledger")]
#[command(long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Enrolled user to act as
    #[arg(short, long)]
    user: String,

    /// Organization the user belongs to
    #[arg(short, long)]
    org: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install chaincode on peers
    Install {
        #[arg(long, value_delimiter = ',', required = true)]
        peers: Vec<PeerRef>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        version: String,
    },
    /// Instantiate installed chaincode on a channel
    Instantiate {
        #[arg(long, value_delimiter = ',', required = true)]
        peers: Vec<PeerRef>,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        version: String,
        #[arg(long, default_value = "init")]
        function: String,
        /// Base64 JSON array of strings
        #[arg(long)]
        args: Option<String>,
    },
    /// Submit a chaincode transaction
    Invoke {
        #[arg(long, value_delimiter = ',', required = true)]
        peers: Vec<PeerRef>,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        version: String,
        #[arg(long)]
        args: Option<String>,
    },
    /// Evaluate chaincode on one peer
    Query {
        #[arg(long)]
        peer: PeerRef,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        version: String,
        #[arg(long)]
        args: Option<String>,
    },
    /// Fetch a block by number
    Block {
        #[arg(long)]
        peer: PeerRef,
        #[arg(long)]
        channel: String,
        #[arg(long, allow_hyphen_values = true)]
        number: String,
    },
    /// Fetch a block by hex hash
    BlockByHash {
        #[arg(long)]
        peer: PeerRef,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        hash: String,
    },
    /// Fetch a transaction by id
    Transaction {
        #[arg(long)]
        peer: PeerRef,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        tx_id: String,
    },
    /// Show chain height and head hashes
    ChainInfo {
        #[arg(long)]
        peer: PeerRef,
        #[arg(long)]
        channel: String,
    },
    /// List installed (or instantiated, with --channel) chaincodes
    Chaincodes {
        #[arg(long)]
        peer: PeerRef,
        #[arg(long, conflicts_with = "channel")]
        installed: bool,
        #[arg(long)]
        channel: Option<String>,
    },
    /// List channels a peer has joined
    Channels {
        #[arg(long)]
        peer: PeerRef,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    logging::init(&config.observability);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let (body, code) = match run(cli, &config, &cancel).await {
        Ok(result) => (json!({ "success": true, "result": result }), ExitCode::SUCCESS),
        Err(e) => (
            json!({ "success": false, "kind": e.kind(), "message": e.to_string() }),
            ExitCode::FAILURE,
        ),
    };

    match serde_json::to_string_pretty(&body) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: {}", e),
    }
    code
}

fn args_or_empty(blob: Option<&str>) -> GatewayResult<Vec<String>> {
    blob.map(decode_args).transpose().map(Option::unwrap_or_default)
}

fn to_json(value: impl serde::Serialize) -> GatewayResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| GatewayError::Decode(format!("Failed to render result: {}", e)))
}

async fn run(cli: Cli, config: &GatewayConfig, cancel: &CancellationToken) -> GatewayResult<Value> {
    // Argument blobs are decoded before anything touches the network.
    let args = match &cli.command {
        Commands::Instantiate { args, .. }
        | Commands::Invoke { args, .. }
        | Commands::Query { args, .. } => args_or_empty(args.as_deref())?,
        _ => Vec::new(),
    };

    let identity = KeystoreIdentityProvider::new(&config.identity.keystore_path)
        .resolve(&cli.user, &cli.org)
        .await?;

    let transport = HttpTransport::new(config.timeouts.proposal())?;
    let gateway = Gateway::new(
        config,
        Arc::new(StaticTopology::from_config(config)),
        Arc::new(transport),
    );

    tracing::debug!(user = %cli.user, org = %cli.org, "Identity resolved");

    match cli.command {
        Commands::Install {
            peers,
            name,
            path,
            version,
        } => {
            let chaincode = ChaincodeDescriptor::new(name, version).with_path(path);
            let result = gateway
                .install_chaincode(peers, chaincode, &identity, cancel)
                .await?;
            Ok(json!({
                "tx_id": result.tx_id(),
                "accepted": result.accepted,
                "endorsements": result.responses.len(),
            }))
        }
        Commands::Instantiate {
            peers,
            channel,
            name,
            version,
            function,
            ..
        } => {
            let chaincode = ChaincodeDescriptor::new(name, version);
            let outcome = gateway
                .instantiate_chaincode(
                    peers, &channel, chaincode, &function, &args, &identity, cancel,
                )
                .await?;
            to_json(outcome)
        }
        Commands::Invoke {
            peers,
            channel,
            name,
            version,
            ..
        } => {
            let chaincode = ChaincodeDescriptor::new(name, version);
            let outcome = gateway
                .invoke_chaincode(peers, &channel, chaincode, &args, &identity, cancel)
                .await?;
            to_json(outcome)
        }
        Commands::Query {
            peer,
            channel,
            name,
            version,
            ..
        } => {
            let chaincode = ChaincodeDescriptor::new(name, version);
            let value = gateway
                .query_chaincode(&peer, &channel, chaincode, &args, &identity, cancel)
                .await?;
            to_json(QueryResult::from(value))
        }
        Commands::Block {
            peer,
            channel,
            number,
        } => {
            let block = gateway
                .get_block_by_number(&peer, &channel, &number, &identity, cancel)
                .await?;
            to_json(QueryResult::from(block))
        }
        Commands::BlockByHash {
            peer,
            channel,
            hash,
        } => {
            let block = gateway
                .get_block_by_hash(&peer, &channel, &hash, &identity, cancel)
                .await?;
            to_json(QueryResult::from(block))
        }
        Commands::Transaction {
            peer,
            channel,
            tx_id,
        } => {
            let tx = gateway
                .get_transaction_by_id(&peer, &channel, &tx_id, &identity, cancel)
                .await?;
            to_json(QueryResult::from(tx))
        }
        Commands::ChainInfo { peer, channel } => {
            let info = gateway
                .get_chain_info(&peer, &channel, &identity, cancel)
                .await?;
            to_json(QueryResult::from(info))
        }
        Commands::Chaincodes {
            peer,
            installed,
            channel,
        } => {
            let list = match (installed, channel) {
                (false, Some(channel)) => {
                    gateway
                        .list_instantiated_chaincodes(&peer, &channel, &identity, cancel)
                        .await?
                }
                (true, _) | (false, None) => {
                    gateway
                        .list_installed_chaincodes(&peer, &identity, cancel)
                        .await?
                }
            };
            to_json(QueryResult::from(list))
        }
        Commands::Channels { peer } => {
            let list = gateway.list_channels(&peer, &identity, cancel).await?;
            to_json(QueryResult::from(list))
        }
    }
}
