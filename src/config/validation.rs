//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (channels reference existing orderers)
//! - Validate value ranges (timeouts > 0, URLs parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::fmt;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let timeouts = [
        ("timeouts.proposal_secs", config.timeouts.proposal_secs),
        ("timeouts.orderer_secs", config.timeouts.orderer_secs),
        ("timeouts.query_secs", config.timeouts.query_secs),
        ("timeouts.commit_secs", config.timeouts.commit_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.chaincode.invoke_function.trim().is_empty() {
        errors.push(ValidationError::new(
            "chaincode.invoke_function",
            "must not be empty",
        ));
    }

    let mut org_names = HashSet::new();
    let mut msp_ids = HashSet::new();
    for (i, org) in config.organizations.iter().enumerate() {
        let field = format!("organizations[{}]", i);
        if org.name.is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        } else if !org_names.insert(org.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate organization '{}'", org.name),
            ));
        }
        if org.msp_id.is_empty() {
            errors.push(ValidationError::new(format!("{}.msp_id", field), "must not be empty"));
        } else if !msp_ids.insert(org.msp_id.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.msp_id", field),
                format!("duplicate MSP id '{}'", org.msp_id),
            ));
        }

        let mut peer_names = HashSet::new();
        for (j, peer) in org.peers.iter().enumerate() {
            let peer_field = format!("{}.peers[{}]", field, j);
            if peer.name.is_empty() || !peer_names.insert(peer.name.as_str()) {
                errors.push(ValidationError::new(
                    format!("{}.name", peer_field),
                    format!("empty or duplicate peer name '{}'", peer.name),
                ));
            }
            if let Err(e) = Url::parse(&peer.url) {
                errors.push(ValidationError::new(
                    format!("{}.url", peer_field),
                    format!("invalid URL '{}': {}", peer.url, e),
                ));
            }
        }
    }

    let mut orderer_names = HashSet::new();
    for (i, orderer) in config.orderers.iter().enumerate() {
        let field = format!("orderers[{}]", i);
        if orderer.name.is_empty() || !orderer_names.insert(orderer.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("empty or duplicate orderer name '{}'", orderer.name),
            ));
        }
        if let Err(e) = Url::parse(&orderer.url) {
            errors.push(ValidationError::new(
                format!("{}.url", field),
                format!("invalid URL '{}': {}", orderer.url, e),
            ));
        }
    }

    let mut channel_names = HashSet::new();
    for (i, channel) in config.channels.iter().enumerate() {
        let field = format!("channels[{}]", i);
        if channel.name.is_empty() || !channel_names.insert(channel.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("empty or duplicate channel name '{}'", channel.name),
            ));
        }
        if !orderer_names.contains(channel.orderer.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.orderer", field),
                format!("unknown orderer '{}'", channel.orderer),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
