//! Runtime module boundary over the shared remediation primitives.

pub use remediation_core::contract;
pub use remediation_core::sanitize;
