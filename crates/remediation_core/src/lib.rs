//! Shared remediation domain primitives.
//!
//! This crate owns the inbound alert-record contract, teardown result types,
//! the error taxonomy, and alert sanitization. It intentionally excludes AWS
//! SDK and Lambda runtime concerns.
//! See `crates/remediation_core/README.md` for ownership boundaries.

pub mod contract;
pub mod sanitize;
