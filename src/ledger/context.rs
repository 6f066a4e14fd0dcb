//! Transaction context construction.
//!
//! A context binds a fresh nonce and the transaction id derived from it to
//! one identity and channel. Contexts are never reused: every attempt,
//! including a caller's retry, builds a new one.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::identity::Identity;
use crate::ledger::types::{GatewayError, GatewayResult};

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Per-attempt transaction context.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    tx_id: String,
    nonce: Vec<u8>,
    channel_id: String,
    identity: Arc<Identity>,
}

impl TransactionContext {
    /// Build a context for `identity` on `channel_id`.
    ///
    /// `channel_id` is empty for channel-less operations (install,
    /// installed-chaincode and channel listings).
    pub fn build(channel_id: impl Into<String>, identity: &Identity) -> GatewayResult<Self> {
        if !identity.is_enrolled() {
            return Err(GatewayError::Identity(format!(
                "User '{}' of '{}' has no enrollment credentials",
                identity.username(),
                identity.organization()
            )));
        }

        let nonce = generate_nonce();
        let tx_id = compute_tx_id(&nonce, identity);

        Ok(Self {
            tx_id,
            nonce,
            channel_id: channel_id.into(),
            identity: Arc::new(identity.clone()),
        })
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Fresh nonce from the operating system CSPRNG.
pub fn generate_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Hex SHA-256 over the nonce followed by the creator bytes.
pub fn compute_tx_id(nonce: &[u8], identity: &Identity) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(identity.creator_bytes());
    hex::encode(hasher.finalize())
}
