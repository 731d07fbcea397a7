//! AWS-oriented adapters and handlers for remediation execution.
//!
//! This crate owns runtime integration details (Lambda handlers, delegated
//! credential brokering, EC2 network operations, and the alert sink) and
//! exposes a single runtime module boundary for the shared contract and
//! sanitization primitives.
//! See `crates/remediation_lambda/README.md` for ownership boundaries.

pub mod adapters;
pub mod handlers;
pub mod runtime;
