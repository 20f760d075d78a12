//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod memory_store;
pub mod mlp_policy_adapter;
pub mod ollama_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
pub mod training_data;
pub mod yahoo_adapter;
