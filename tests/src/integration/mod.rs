//! Cross-crate integration scenarios, one module per concern.

pub mod env_flows;
