//! Instrument catalog refresh
//!
//! The primary code/name list is authoritative: it decides which instruments
//! exist this run, and losing it aborts the run. The per-exchange
//! directories and the listing-date lookup only enrich it; each of them may
//! fail on its own and degrades to an empty contribution.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::db::models::Instrument;
use crate::error::{AppError, Result};
use crate::feed::{DirectoryEntry, Exchange, InstrumentListing, MarketFeed};
use crate::sync::clock::Clock;
use crate::sync::retry::RetryPolicy;

pub struct CatalogSynchronizer<'a> {
    feed: &'a dyn MarketFeed,
    retry: RetryPolicy,
    clock: &'a dyn Clock,
}

impl<'a> CatalogSynchronizer<'a> {
    pub fn new(feed: &'a dyn MarketFeed, retry: RetryPolicy, clock: &'a dyn Clock) -> Self {
        Self { feed, retry, clock }
    }

    /// Fetch and merge the instrument catalog
    ///
    /// An error here is fatal to the whole run: with no instrument set there
    /// is nothing left to synchronize.
    pub async fn refresh(&self) -> Result<Vec<Instrument>> {
        info!("Refreshing instrument catalog");

        let primary = self
            .retry
            .run(self.clock, || self.feed.fetch_instrument_list())
            .await
            .map_err(|e| AppError::CatalogUnavailable(e.to_string()))?;

        if primary.is_empty() {
            return Err(AppError::CatalogUnavailable(
                "provider returned an empty instrument list".into(),
            ));
        }
        info!("Fetched {} instruments from the primary list", primary.len());

        let mut directories = Vec::with_capacity(Exchange::ALL.len());
        for exchange in Exchange::ALL {
            match self.feed.fetch_exchange_directory(exchange).await {
                Ok(entries) => directories.push((exchange, entries)),
                Err(e) => {
                    warn!("Failed to fetch {} directory: {}", exchange.tag(), e);
                    directories.push((exchange, Vec::new()));
                }
            }
        }

        // Best-effort: missing listing dates stay null on the instrument row
        let list_dates = match self.feed.fetch_list_dates().await {
            Ok(dates) => dates,
            Err(e) => {
                warn!("Listing-date lookup failed: {}", e);
                HashMap::new()
            }
        };

        Ok(merge_catalog(&primary, &directories, &list_dates))
    }
}

/// Join the primary list with exchange enrichment by code
///
/// The primary name wins; the enrichment name is only used when the primary
/// one is missing. Fields the directories cannot supply stay absent.
pub fn merge_catalog(
    primary: &[InstrumentListing],
    directories: &[(Exchange, Vec<DirectoryEntry>)],
    list_dates: &HashMap<String, NaiveDate>,
) -> Vec<Instrument> {
    let mut enrichment: HashMap<&str, (Exchange, &DirectoryEntry)> = HashMap::new();
    for (exchange, entries) in directories {
        for entry in entries {
            enrichment
                .entry(entry.code.as_str())
                .or_insert((*exchange, entry));
        }
    }

    primary
        .iter()
        .map(|listing| {
            let hit = enrichment.get(listing.code.as_str());
            let name = if listing.name.is_empty() {
                hit.and_then(|(_, entry)| entry.name.clone()).unwrap_or_default()
            } else {
                listing.name.clone()
            };

            Instrument {
                code: listing.code.clone(),
                name,
                industry: hit.and_then(|(_, entry)| entry.industry.clone()),
                area: hit.and_then(|(_, entry)| entry.area.clone()),
                market: hit.map(|(exchange, _)| exchange.tag().to_string()),
                list_date: list_dates.get(&listing.code).copied(),
            }
        })
        .collect()
}
