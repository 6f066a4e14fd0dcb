//! Ledger queries against scripted peers.

use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use chaincode_gateway::ledger::query::{CSCC, LSCC, QSCC};
use chaincode_gateway::ledger::{ChaincodeDescriptor, QueryResult};

mod common;
use common::{gateway, identity, peer, MockTransport, Reply, CHANNEL};

#[tokio::test]
async fn test_query_returns_payload_verbatim() {
    let transport = MockTransport::new();
    transport.script("org1/peer1", Reply::ok("42"));

    let value = gateway(transport.clone())
        .query_chaincode(
            &peer("org1/peer1"),
            CHANNEL,
            ChaincodeDescriptor::new("mycc", "v1"),
            &["query".into(), "a".into()],
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(value.as_bytes(), b"42");
    assert_eq!(value.text(), "42");
    assert_eq!(serde_json::to_string(&QueryResult::from(value)).unwrap(), "\"42\"");

    let proposals = transport.proposals();
    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].1.function.as_deref(), Some("invoke"));
    assert_eq!(proposals[0].1.chaincode.name, "mycc");
    assert!(transport.broadcasts().is_empty());
}

#[tokio::test]
async fn test_query_empty_payload_is_not_an_error() {
    let transport = MockTransport::new();
    transport.script("org1/peer1", Reply::ok(""));

    let value = gateway(transport)
        .query_chaincode(
            &peer("org1/peer1"),
            CHANNEL,
            ChaincodeDescriptor::new("mycc", "v1"),
            &[],
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(value.is_empty());
}

#[tokio::test]
async fn test_query_peer_error_is_query_failure() {
    let transport = MockTransport::new();
    transport.script("org1/peer1", Reply::status(500));

    let err = gateway(transport)
        .query_chaincode(
            &peer("org1/peer1"),
            CHANNEL,
            ChaincodeDescriptor::new("mycc", "v1"),
            &[],
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "QueryFailure");
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_negative_block_number_fails_before_contacting_peer() {
    let transport = MockTransport::new();
    let err = gateway(transport.clone())
        .get_block_by_number(
            &peer("org1/peer1"),
            CHANNEL,
            "-1",
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "DecodeError");
    assert_eq!(transport.proposal_calls(), 0);
}

#[tokio::test]
async fn test_bad_identifiers_fail_before_resolution() {
    let transport = MockTransport::new();
    let gateway = gateway(transport.clone());
    let ghost = peer("org9/ghost");

    let err = gateway
        .get_block_by_hash(&ghost, CHANNEL, "zz", &identity(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "DecodeError");

    let err = gateway
        .get_transaction_by_id(&ghost, CHANNEL, "", &identity(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "DecodeError");
    assert_eq!(transport.proposal_calls(), 0);
}

#[tokio::test]
async fn test_block_by_number() {
    let transport = MockTransport::new();
    transport.script(
        "org1/peer1",
        Reply::ok(
            &json!({
                "header": {"number": 3, "previous_hash": "AQI=", "data_hash": "AwQ="},
                "transactions": ["abc"]
            })
            .to_string(),
        ),
    );

    let block = gateway(transport.clone())
        .get_block_by_number(
            &peer("org1/peer1"),
            CHANNEL,
            "3",
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(block.header.number, 3);
    assert_eq!(block.header.previous_hash, vec![1, 2]);
    assert_eq!(block.transactions, vec!["abc".to_string()]);

    let (_, payload) = &transport.proposals()[0];
    assert_eq!(payload.chaincode.name, QSCC);
    assert_eq!(payload.function.as_deref(), Some("GetBlockByNumber"));
    assert_eq!(payload.args, vec![CHANNEL.as_bytes().to_vec(), b"3".to_vec()]);
}

#[tokio::test]
async fn test_block_by_hash_sends_raw_hash() {
    let transport = MockTransport::new();
    transport.script(
        "org1/peer1",
        Reply::ok(r#"{"header":{"number":1,"previous_hash":"","data_hash":""}}"#),
    );

    let block = gateway(transport.clone())
        .get_block_by_hash(
            &peer("org1/peer1"),
            CHANNEL,
            "0aff",
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(block.header.number, 1);
    assert!(block.transactions.is_empty());

    let (_, payload) = &transport.proposals()[0];
    assert_eq!(payload.function.as_deref(), Some("GetBlockByHash"));
    assert_eq!(payload.args[1], vec![0x0a, 0xff]);
}

#[tokio::test]
async fn test_transaction_and_chain_info() {
    let transport = MockTransport::new();
    let gateway = gateway(transport.clone());

    transport.script(
        "org1/peer1",
        Reply::ok(r#"{"tx_id":"abc123","validation_code":0,"block_number":5}"#),
    );
    let tx = gateway
        .get_transaction_by_id(
            &peer("org1/peer1"),
            CHANNEL,
            "abc123",
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(tx.validation_code, 0);
    assert_eq!(tx.block_number, Some(5));

    transport.script(
        "org1/peer1",
        Reply::ok(r#"{"height":6,"current_block_hash":"AQ==","previous_block_hash":"Ag=="}"#),
    );
    let info = gateway
        .get_chain_info(&peer("org1/peer1"), CHANNEL, &identity(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(info.height, 6);
    assert_eq!(info.current_block_hash, vec![1]);
}

#[tokio::test]
async fn test_malformed_block_payload_is_query_failure() {
    let transport = MockTransport::new();
    transport.script("org1/peer1", Reply::ok("<html>"));

    let err = gateway(transport)
        .get_block_by_number(
            &peer("org1/peer1"),
            CHANNEL,
            "0",
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "QueryFailure");
}

#[tokio::test]
async fn test_chaincode_listings_are_normalized() {
    let transport = MockTransport::new();
    transport.script(
        "org1/peer1",
        Reply::ok(
            &json!({
                "chaincodes": [
                    {"name": "mycc", "version": "v1", "path": "github.com/mycc"},
                    {"name": "other", "version": "2"}
                ]
            })
            .to_string(),
        ),
    );
    let gateway = gateway(transport.clone());

    let installed = gateway
        .list_installed_chaincodes(&peer("org1/peer1"), &identity(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(installed.len(), 2);
    assert_eq!(installed[0].path, "github.com/mycc");
    assert_eq!(installed[1].path, "");

    let instantiated = gateway
        .list_instantiated_chaincodes(
            &peer("org1/peer1"),
            CHANNEL,
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(instantiated, installed);

    let proposals = transport.proposals();
    assert_eq!(proposals[0].1.chaincode.name, LSCC);
    assert_eq!(proposals[0].1.function.as_deref(), Some("getinstalledchaincodes"));
    assert_eq!(proposals[0].1.channel_id, "");
    assert_eq!(proposals[1].1.function.as_deref(), Some("getchaincodes"));
    assert_eq!(proposals[1].1.channel_id, CHANNEL);
}

#[tokio::test]
async fn test_channel_listing() {
    let transport = MockTransport::new();
    transport.script(
        "org1/peer1",
        Reply::ok(r#"{"channels":[{"channel_id":"mychannel"},{"channelId":"other"}]}"#),
    );

    let channels = gateway(transport.clone())
        .list_channels(&peer("org1/peer1"), &identity(), &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<_> = channels.iter().map(|c| c.channel_id.as_str()).collect();
    assert_eq!(names, vec!["mychannel", "other"]);
    assert_eq!(transport.proposals()[0].1.chaincode.name, CSCC);
}

#[tokio::test]
async fn test_unknown_query_peer_is_unreachable() {
    let transport = MockTransport::new();
    let err = gateway(transport.clone())
        .get_chain_info(&peer("org9/ghost"), CHANNEL, &identity(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "NetworkUnreachable");
    assert_eq!(transport.proposal_calls(), 0);
}

#[tokio::test]
async fn test_missing_transaction_is_query_failure() {
    let transport = MockTransport::new();
    transport.script("org1/peer1", Reply::status(404));

    let err = gateway(transport)
        .get_transaction_by_id(
            &peer("org1/peer1"),
            CHANNEL,
            "abc123",
            &identity(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "QueryFailure");
    assert!(err.to_string().contains("transaction abc123 not found"));
}

#[tokio::test]
async fn test_cancelling_one_query_leaves_others_running() {
    let transport = MockTransport::new();
    transport.script("org1/peer2", Reply::Hang);
    transport.script(
        "org1/peer1",
        Reply::ok(r#"{"height":5,"current_block_hash":"AQI=","previous_block_hash":""}"#),
    );
    let gateway = gateway(transport);
    let identity = identity();

    let stalled_cancel = CancellationToken::new();
    let trigger = stalled_cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let other_cancel = CancellationToken::new();
    let peer2 = peer("org1/peer2");
    let peer1 = peer("org1/peer1");
    let (stalled, answered) = tokio::join!(
        gateway.get_chain_info(&peer2, CHANNEL, &identity, &stalled_cancel),
        gateway.get_chain_info(&peer1, CHANNEL, &identity, &other_cancel),
    );
    assert_eq!(stalled.unwrap_err().kind(), "Cancelled");
    assert_eq!(answered.unwrap().height, 5);
    assert!(!other_cancel.is_cancelled());

    let later = gateway
        .get_chain_info(&peer("org1/peer1"), CHANNEL, &identity, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(later.height, 5);
}
