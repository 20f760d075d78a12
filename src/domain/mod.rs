//! Core domain types and logic.
//!
//! Everything here is transport-free: external capabilities arrive through
//! the traits in [`crate::ports`].

pub mod action;
pub mod baseline;
pub mod chat;
pub mod config_validation;
pub mod error;
pub mod extraction;
pub mod indicator;
pub mod inference;
pub mod market_data;
pub mod narrative;
pub mod observation;
pub mod ohlcv;
pub mod pipeline;
pub mod quote;
pub mod recommendation;
pub mod universe;
pub mod watchlist;
