//! Market data feed adapters

pub mod eastmoney;

use std::collections::HashMap;

use crate::db::models::PriceBar;
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub use eastmoney::EastmoneyFeed;

/// Mainland exchanges the enrichment directories are fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Shanghai,
    Shenzhen,
}

impl Exchange {
    /// All exchanges, in the order directories are fetched
    pub const ALL: [Exchange; 2] = [Exchange::Shanghai, Exchange::Shenzhen];

    /// Market tag stored on the instrument row
    pub fn tag(&self) -> &'static str {
        match self {
            Exchange::Shanghai => "SH",
            Exchange::Shenzhen => "SZ",
        }
    }
}

/// Code/name pair from the primary instrument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentListing {
    pub code: String,
    pub name: String,
}

/// Per-exchange directory row used to enrich the primary list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub code: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub area: Option<String>,
}

/// Market data feed that all provider implementations must implement
///
/// Every call may fail transiently; callers wrap them in the retry policy.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Feed ID (e.g., "eastmoney")
    fn id(&self) -> &'static str;

    /// Fetch the primary code/name list for the whole market
    async fn fetch_instrument_list(&self) -> Result<Vec<InstrumentListing>>;

    /// Fetch one exchange's directory (industry/area enrichment)
    async fn fetch_exchange_directory(&self, exchange: Exchange) -> Result<Vec<DirectoryEntry>>;

    /// Fetch listing dates keyed by code (best-effort)
    async fn fetch_list_dates(&self) -> Result<HashMap<String, NaiveDate>>;

    /// Fetch forward-adjusted daily bars for one instrument and date range
    async fn fetch_daily_prices(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>>;

    /// Fetch concept board names one instrument belongs to
    async fn fetch_concepts(&self, code: &str) -> Result<Vec<String>>;
}
