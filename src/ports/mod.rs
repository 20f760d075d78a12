//! Port traits: the boundary between domain logic and the outside world.

pub mod config_port;
pub mod market_data_port;
pub mod policy_port;
pub mod store_port;
pub mod text_port;
