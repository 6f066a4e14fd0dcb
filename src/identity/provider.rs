//! Identity providers.
//!
//! # Responsibilities
//! - Resolve (username, organization) to a signing identity
//! - Fail with `IdentityError` when the user is unknown or not enrolled

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::identity::types::Identity;
use crate::ledger::types::{GatewayError, GatewayResult};

/// Source of signing identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, username: &str, organization: &str) -> GatewayResult<Identity>;
}

/// In-memory provider.
#[derive(Debug, Default, Clone)]
pub struct StaticIdentityProvider {
    identities: HashMap<(String, String), Identity>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identity: Identity) {
        let key = (
            identity.username().to_string(),
            identity.organization().to_string(),
        );
        self.identities.insert(key, identity);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, username: &str, organization: &str) -> GatewayResult<Identity> {
        self.identities
            .get(&(username.to_string(), organization.to_string()))
            .cloned()
            .ok_or_else(|| {
                GatewayError::Identity(format!(
                    "User '{}' is not registered with organization '{}'",
                    username, organization
                ))
            })
    }
}

/// On-disk user record: `{keystore}/{org}/{username}.json`.
#[derive(Debug, Deserialize)]
struct UserRecord {
    msp_id: String,
    /// PEM enrollment certificate.
    certificate: String,
    /// Hex-encoded signing key.
    signing_key: String,
}

/// Provider backed by a directory of enrolled user records.
#[derive(Debug, Clone)]
pub struct KeystoreIdentityProvider {
    root: PathBuf,
}

impl KeystoreIdentityProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, username: &str, organization: &str) -> GatewayResult<PathBuf> {
        let safe = |part: &str| {
            !part.is_empty() && !part.contains(['/', '\\']) && part != "." && part != ".."
        };
        if !safe(username) || !safe(organization) {
            return Err(GatewayError::Identity(format!(
                "Invalid user or organization name: '{}' / '{}'",
                username, organization
            )));
        }
        Ok(self
            .root
            .join(organization)
            .join(format!("{}.json", username)))
    }
}

#[async_trait]
impl IdentityProvider for KeystoreIdentityProvider {
    async fn resolve(&self, username: &str, organization: &str) -> GatewayResult<Identity> {
        let path = self.record_path(username, organization)?;
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            GatewayError::Identity(format!(
                "User '{}' of '{}' is not enrolled ({}): {}",
                username,
                organization,
                path.display(),
                e
            ))
        })?;
        let record: UserRecord = serde_json::from_str(&content).map_err(|e| {
            GatewayError::Identity(format!("Malformed user record {}: {}", path.display(), e))
        })?;

        let identity = Identity::from_hex_key(
            username,
            organization,
            record.msp_id,
            record.certificate.into_bytes(),
            &record.signing_key,
        )?;
        if !identity.is_enrolled() {
            return Err(GatewayError::Identity(format!(
                "User '{}' of '{}' has no enrollment certificate",
                username, organization
            )));
        }

        tracing::debug!(
            username = %username,
            organization = %organization,
            msp_id = %identity.msp_id(),
            "Identity loaded from keystore"
        );
        Ok(identity)
    }
}
