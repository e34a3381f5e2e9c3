//! Sync orchestration
//!
//! One run: catalog refresh, per-instrument window planning, paced fetches
//! under the retry policy, idempotent persistence. A failure is scoped to
//! the instrument that raised it; only losing the catalog aborts the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::{HistoryPeriod, SyncConfig};
use crate::db::models::ConceptTag;
use crate::db::StockDb;
use crate::error::Result;
use crate::feed::MarketFeed;
use crate::sync::catalog::CatalogSynchronizer;
use crate::sync::clock::Clock;
use crate::sync::planner::{plan_fetch, FetchPlan};
use crate::sync::retry::FetchOutcome;

/// Options for one run
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// How far back full-window fetches reach
    pub period: HistoryPeriod,
    /// Shrink windows to the unseen tail using stored watermarks
    pub incremental: bool,
    /// Process only the first N instruments of the catalog
    pub limit: Option<usize>,
}

impl RunOptions {
    /// The nightly refresh: incremental over the whole catalog
    pub fn daily() -> Self {
        Self {
            period: HistoryPeriod::All,
            incremental: true,
            limit: None,
        }
    }
}

/// Outcome counts for one run
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Drives one synchronization run end to end
pub struct SyncEngine {
    db: Arc<StockDb>,
    feed: Arc<dyn MarketFeed>,
    config: SyncConfig,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    pub fn new(
        db: Arc<StockDb>,
        feed: Arc<dyn MarketFeed>,
        config: SyncConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            feed,
            config,
            clock,
        }
    }

    /// Run the daily incremental update
    pub async fn daily_update(&self) -> Result<RunSummary> {
        self.run(RunOptions::daily()).await
    }

    /// Execute one full run
    ///
    /// Returns `Err` only when the catalog cannot be refreshed; everything
    /// else is absorbed into the per-instrument failure count.
    pub async fn run(&self, options: RunOptions) -> Result<RunSummary> {
        let started = Instant::now();
        let today = self.clock.today();
        info!(
            "Starting sync run (incremental: {}, reference date: {})",
            options.incremental, today
        );

        // Catalog refresh is the only fatal stage
        let catalog =
            CatalogSynchronizer::new(self.feed.as_ref(), self.config.retry, self.clock.as_ref())
                .refresh()
                .await?;
        self.db.replace_instruments(&catalog)?;

        let mut instruments = catalog;
        if let Some(limit) = options.limit {
            instruments.truncate(limit);
            info!("Limiting run to the first {} instruments", instruments.len());
        }

        // Bulk watermark resolution: one query for the whole catalog
        let watermarks = if options.incremental {
            self.db.latest_trade_dates()?
        } else {
            Default::default()
        };

        let floor = options.period.floor(today);
        let total = instruments.len();
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for (index, instrument) in instruments.iter().enumerate() {
            let code = instrument.code.as_str();
            info!(
                "({}/{}) syncing {} {}",
                index + 1,
                total,
                code,
                instrument.name
            );

            let plan = if options.incremental {
                plan_fetch(today, watermarks.get(code).copied(), floor)
            } else {
                FetchPlan::Full {
                    start: floor,
                    end: today,
                }
            };

            let mut instrument_failed = false;

            match plan.window() {
                Some((start, end)) => {
                    let outcome = self
                        .config
                        .retry
                        .fetch_rows(self.clock.as_ref(), || {
                            self.feed.fetch_daily_prices(code, start, end)
                        })
                        .await;

                    match outcome {
                        FetchOutcome::Rows(bars) => match self.db.upsert_prices(&bars) {
                            Ok(count) => debug!("Stored {} bars for {}", count, code),
                            Err(e) => {
                                error!("Failed to store prices for {}: {}", code, e);
                                instrument_failed = true;
                            }
                        },
                        FetchOutcome::Empty => {
                            warn!("No price data for {} in {}..{}", code, start, end);
                        }
                        FetchOutcome::Failed(e) => {
                            error!("Failed to fetch prices for {}: {}", code, e);
                            instrument_failed = true;
                        }
                    }
                }
                None => debug!("{} is up to date, skipping price fetch", code),
            }

            // Concepts are refreshed even when prices are up to date
            let outcome = self
                .config
                .retry
                .fetch_rows(self.clock.as_ref(), || self.feed.fetch_concepts(code))
                .await;

            match outcome {
                FetchOutcome::Rows(names) => {
                    let tags = normalize_concepts(code, names, self.config.concept_cap);
                    match self.db.append_concepts(&tags) {
                        Ok(_) => debug!("Stored {} concepts for {}", tags.len(), code),
                        Err(e) => {
                            error!("Failed to store concepts for {}: {}", code, e);
                            instrument_failed = true;
                        }
                    }
                }
                FetchOutcome::Empty => debug!("No concept data for {}", code),
                FetchOutcome::Failed(e) => {
                    error!("Failed to fetch concepts for {}: {}", code, e);
                    instrument_failed = true;
                }
            }

            if instrument_failed {
                failed += 1;
            } else {
                succeeded += 1;
            }

            self.config
                .pacing
                .pause_after(self.clock.as_ref(), index, total)
                .await;
        }

        let elapsed = started.elapsed();
        info!(
            "Sync run complete in {:.2}s - {} succeeded, {} failed",
            elapsed.as_secs_f64(),
            succeeded,
            failed
        );

        Ok(RunSummary {
            total,
            succeeded,
            failed,
            elapsed,
        })
    }
}

/// Dedup one fetch's concept names and keep at most `cap` of them
///
/// The cap applies within a single fetch; earlier runs' rows are untouched.
pub fn normalize_concepts(code: &str, names: Vec<String>, cap: usize) -> Vec<ConceptTag> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .take(cap)
        .map(|concept| ConceptTag {
            code: code.to_string(),
            concept,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concepts_are_deduplicated_and_capped() {
        let names: Vec<String> = (0..15).map(|i| format!("Concept {}", i)).collect();
        let tags = normalize_concepts("600000", names, 10);
        assert_eq!(tags.len(), 10);

        let names = vec![
            "AI".to_string(),
            "AI".to_string(),
            "Chips".to_string(),
            "".to_string(),
        ];
        let tags = normalize_concepts("600000", names, 10);
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|t| t.code == "600000"));
    }
}
