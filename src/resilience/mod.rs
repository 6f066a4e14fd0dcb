//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to peer or orderer:
//!     → timeouts.rs (enforce per-call timeout, observe cancellation)
//!     → Completed / TimedOut / Cancelled handed back to the caller
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Timeouts are per target, never global, so one slow peer cannot starve the rest
//! - No automatic retries: re-sending a state-changing proposal is the caller's decision

pub mod timeouts;

pub use timeouts::{with_deadline, Deadline};
