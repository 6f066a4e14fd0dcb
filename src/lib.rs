//! Client-side gateway for a permissioned ledger network.

pub mod config;
pub mod identity;
pub mod ledger;
pub mod observability;
pub mod resilience;
pub mod topology;

pub use config::schema::GatewayConfig;
pub use identity::Identity;
pub use ledger::{CommitOutcome, EndorsementResult, Gateway, GatewayError, GatewayResult};
