//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → topology, timeouts and conventions handed to the gateway
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - No channel or peer is implied: operations name them explicitly

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ChaincodeConfig, ChannelConfig, GatewayConfig, IdentityConfig, ObservabilityConfig,
    OrdererConfig, OrganizationConfig, PeerConfig, TimeoutConfig,
};
