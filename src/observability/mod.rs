//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Every gateway operation runs in a span carrying its operation ID,
//! so peer dispatches and state changes correlate in the logs.
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Signing keys and certificates are never logged
//! - Metrics are cheap (atomic increments) and exporter-agnostic

pub mod logging;
pub mod metrics;
