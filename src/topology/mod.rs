//! Network topology subsystem.
//!
//! Resolves logical peer and orderer names to endpoints. Resolution happens
//! per call; resolved targets are never cached by the gateway.

pub mod resolver;

pub use resolver::{StaticTopology, TopologyResolver};
