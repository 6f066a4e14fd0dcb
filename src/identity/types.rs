//! Signing identity held for the duration of one operation.
//!
//! # Security
//! - Signing keys are never logged or serialized
//! - `Debug` output redacts the key

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use std::fmt;

use crate::ledger::types::{GatewayError, GatewayResult};

/// An enrolled member of an organization, able to sign proposals and envelopes.
#[derive(Clone)]
pub struct Identity {
    username: String,
    organization: String,
    msp_id: String,
    /// Enrollment certificate (PEM). Empty means not enrolled.
    certificate: Vec<u8>,
    signing_key: SigningKey,
}

impl Identity {
    pub fn new(
        username: impl Into<String>,
        organization: impl Into<String>,
        msp_id: impl Into<String>,
        certificate: Vec<u8>,
        signing_key: SigningKey,
    ) -> Self {
        Self {
            username: username.into(),
            organization: organization.into(),
            msp_id: msp_id.into(),
            certificate,
            signing_key,
        }
    }

    /// Build an identity from a hex-encoded P-256 scalar.
    ///
    /// The key is parsed and never logged.
    pub fn from_hex_key(
        username: impl Into<String>,
        organization: impl Into<String>,
        msp_id: impl Into<String>,
        certificate: Vec<u8>,
        signing_key_hex: &str,
    ) -> GatewayResult<Self> {
        let key_hex = signing_key_hex
            .trim()
            .strip_prefix("0x")
            .unwrap_or(signing_key_hex.trim());
        let bytes = hex::decode(key_hex)
            .map_err(|e| GatewayError::Identity(format!("Invalid signing key encoding: {}", e)))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| GatewayError::Identity(format!("Invalid signing key: {}", e)))?;

        Ok(Self::new(username, organization, msp_id, certificate, signing_key))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    /// An identity without credential material cannot sign for the network.
    pub fn is_enrolled(&self) -> bool {
        !self.certificate.is_empty() && !self.msp_id.is_empty()
    }

    /// Serialized creator: MSP id followed by the certificate.
    pub fn creator_bytes(&self) -> Vec<u8> {
        let mut creator = Vec::with_capacity(self.msp_id.len() + self.certificate.len());
        creator.extend_from_slice(self.msp_id.as_bytes());
        creator.extend_from_slice(&self.certificate);
        creator
    }

    /// Sign a message (SHA-256 digest, ECDSA P-256, 64-byte r||s).
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_bytes().to_vec()
    }

    /// Check a signature produced by [`Identity::sign`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        VerifyingKey::from(&self.signing_key)
            .verify(message, &signature)
            .is_ok()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("organization", &self.organization)
            .field("msp_id", &self.msp_id)
            .field("certificate_len", &self.certificate.len())
            .field("signing_key", &"<redacted>")
            .finish()
    }
}
