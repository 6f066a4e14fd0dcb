//! Identity subsystem.
//!
//! # Data Flow
//! ```text
//! (username, organization)
//!     → provider.rs (keystore lookup or in-memory map)
//!     → types.rs (Identity: certificate + signing key)
//!     → passed explicitly into each gateway operation
//! ```
//!
//! Identities are never cached across operations by the gateway.

pub mod provider;
pub mod types;

pub use provider::{IdentityProvider, KeystoreIdentityProvider, StaticIdentityProvider};
pub use types::Identity;
