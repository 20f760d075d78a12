//! Market data access port.

use async_trait::async_trait;

use crate::domain::error::AdvisorError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::quote::{CompanyProfile, Quote};

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Daily bars covering the last `days` calendar days, ascending by date.
    /// An unknown ticker or empty range yields `Ok(vec![])`.
    async fn history(&self, ticker: &str, days: u32) -> Result<Vec<OhlcvBar>, AdvisorError>;

    async fn quote(&self, ticker: &str) -> Result<Quote, AdvisorError>;

    async fn profile(&self, ticker: &str) -> Result<CompanyProfile, AdvisorError>;
}
