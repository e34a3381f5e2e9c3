//! End-to-end engine tests against a scripted feed

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use stocksync::config::{HistoryPeriod, SyncConfig};
use stocksync::db::models::PriceBar;
use stocksync::db::StockDb;
use stocksync::error::{AppError, Result};
use stocksync::feed::{DirectoryEntry, Exchange, InstrumentListing, MarketFeed};
use stocksync::sync::{Clock, RunOptions, SyncEngine};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn bar(code: &str, d: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        code: code.to_string(),
        date: d,
        open: close - 0.5,
        high: close + 0.5,
        low: close - 1.0,
        close,
        volume: 10_000.0,
        amount: Some(close * 10_000.0),
        pct_change: Some(1.0),
        turnover_rate: Some(0.4),
    }
}

/// Fixed-date clock that records sleeps instead of waiting
struct ManualClock {
    today: Mutex<NaiveDate>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    fn at(today: NaiveDate) -> Arc<Self> {
        Arc::new(Self {
            today: Mutex::new(today),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    fn advance_to(&self, today: NaiveDate) {
        *self.today.lock() = today;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// Scripted in-memory feed
#[derive(Default)]
struct MockFeed {
    listings: Mutex<Vec<InstrumentListing>>,
    directories: HashMap<Exchange, Vec<DirectoryEntry>>,
    prices: HashMap<String, Vec<PriceBar>>,
    concepts: HashMap<String, Vec<String>>,
    failing_price_codes: HashSet<String>,
    fail_instrument_list: bool,
    price_calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
    concept_calls: Mutex<Vec<String>>,
}

impl MockFeed {
    fn set_listings(&self, codes: &[(&str, &str)]) {
        *self.listings.lock() = codes
            .iter()
            .map(|(code, name)| InstrumentListing {
                code: code.to_string(),
                name: name.to_string(),
            })
            .collect();
    }
}

#[async_trait]
impl MarketFeed for MockFeed {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn fetch_instrument_list(&self) -> Result<Vec<InstrumentListing>> {
        if self.fail_instrument_list {
            return Err(AppError::Feed("primary list unavailable".into()));
        }
        Ok(self.listings.lock().clone())
    }

    async fn fetch_exchange_directory(&self, exchange: Exchange) -> Result<Vec<DirectoryEntry>> {
        Ok(self.directories.get(&exchange).cloned().unwrap_or_default())
    }

    async fn fetch_list_dates(&self) -> Result<HashMap<String, NaiveDate>> {
        Ok(HashMap::new())
    }

    async fn fetch_daily_prices(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>> {
        self.price_calls
            .lock()
            .push((code.to_string(), start, end));

        if self.failing_price_codes.contains(code) {
            return Err(AppError::Feed(format!("connection reset for {}", code)));
        }

        Ok(self
            .prices
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_concepts(&self, code: &str) -> Result<Vec<String>> {
        self.concept_calls.lock().push(code.to_string());
        Ok(self.concepts.get(code).cloned().unwrap_or_default())
    }
}

fn engine_with(feed: Arc<MockFeed>, clock: Arc<ManualClock>) -> (SyncEngine, Arc<StockDb>) {
    let db = Arc::new(StockDb::in_memory().unwrap());
    let engine = SyncEngine::new(db.clone(), feed, SyncConfig::default(), clock);
    (engine, db)
}

fn full_run() -> RunOptions {
    RunOptions {
        period: HistoryPeriod::All,
        incremental: false,
        limit: None,
    }
}

fn incremental_run() -> RunOptions {
    RunOptions {
        period: HistoryPeriod::All,
        incremental: true,
        limit: None,
    }
}

#[tokio::test]
async fn running_twice_leaves_the_same_state_as_once() {
    let mut feed = MockFeed::default();
    feed.set_listings(&[("600000", "PuFa Bank")]);
    feed.prices.insert(
        "600000".to_string(),
        vec![bar("600000", date(2024, 1, 10), 10.0), bar("600000", date(2024, 1, 11), 10.1)],
    );
    feed.concepts
        .insert("600000".to_string(), vec!["Banking".to_string()]);
    let feed = Arc::new(feed);
    let clock = ManualClock::at(date(2024, 1, 15));
    let (engine, db) = engine_with(feed, clock);

    engine.run(full_run()).await.unwrap();
    let prices_after_first = db.get_prices("600000", None, None).unwrap();

    engine.run(full_run()).await.unwrap();
    let prices_after_second = db.get_prices("600000", None, None).unwrap();

    assert_eq!(prices_after_first, prices_after_second);
    assert_eq!(db.count_instruments().unwrap(), 1);
    assert_eq!(db.get_concepts("600000").unwrap().len(), 1);
}

#[tokio::test]
async fn one_failing_instrument_does_not_abort_the_run() {
    let mut feed = MockFeed::default();
    feed.set_listings(&[("000001", "A"), ("000002", "B"), ("000003", "C")]);
    for code in ["000001", "000002", "000003"] {
        feed.prices
            .insert(code.to_string(), vec![bar(code, date(2024, 1, 10), 9.0)]);
    }
    feed.failing_price_codes.insert("000002".to_string());
    let feed = Arc::new(feed);
    let clock = ManualClock::at(date(2024, 1, 15));
    let (engine, db) = engine_with(feed.clone(), clock);

    let summary = engine.run(full_run()).await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(db.get_prices("000001", None, None).unwrap().len(), 1);
    assert!(db.get_prices("000002", None, None).unwrap().is_empty());
    assert_eq!(db.get_prices("000003", None, None).unwrap().len(), 1);

    // The failing instrument was retried the full attempt count
    let attempts = feed
        .price_calls
        .lock()
        .iter()
        .filter(|(code, _, _)| code == "000002")
        .count();
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn losing_the_primary_list_writes_nothing() {
    let mut feed = MockFeed::default();
    feed.fail_instrument_list = true;
    feed.prices
        .insert("600000".to_string(), vec![bar("600000", date(2024, 1, 10), 10.0)]);
    let feed = Arc::new(feed);
    let clock = ManualClock::at(date(2024, 1, 15));
    let (engine, db) = engine_with(feed, clock);

    let result = engine.run(full_run()).await;

    assert!(matches!(result, Err(AppError::CatalogUnavailable(_))));
    assert_eq!(db.count_instruments().unwrap(), 0);
    assert_eq!(db.count_prices().unwrap(), 0);
}

#[tokio::test]
async fn concept_fetch_is_capped_at_ten_per_instrument() {
    let mut feed = MockFeed::default();
    feed.set_listings(&[("600000", "PuFa Bank")]);
    feed.concepts.insert(
        "600000".to_string(),
        (0..15).map(|i| format!("Concept {}", i)).collect(),
    );
    let feed = Arc::new(feed);
    let clock = ManualClock::at(date(2024, 1, 15));
    let (engine, db) = engine_with(feed, clock);

    engine.run(full_run()).await.unwrap();

    assert_eq!(db.get_concepts("600000").unwrap().len(), 10);
}

#[tokio::test]
async fn catalog_refresh_removes_delisted_instruments() {
    let mut base = MockFeed::default();
    base.set_listings(&[("600000", "PuFa Bank"), ("000001", "PingAn Bank")]);
    let feed = Arc::new(base);
    let clock = ManualClock::at(date(2024, 1, 15));
    let (engine, db) = engine_with(feed.clone(), clock);

    engine.run(full_run()).await.unwrap();
    assert_eq!(db.count_instruments().unwrap(), 2);

    feed.set_listings(&[("600000", "PuFa Bank")]);
    engine.run(full_run()).await.unwrap();

    assert_eq!(db.count_instruments().unwrap(), 1);
    assert!(db.get_instrument("000001").unwrap().is_none());
}

#[tokio::test]
async fn incremental_run_requests_only_the_unseen_tail() {
    let mut feed = MockFeed::default();
    feed.set_listings(&[("600000", "PuFa Bank")]);
    feed.prices.insert(
        "600000".to_string(),
        vec![bar("600000", date(2024, 1, 10), 10.0)],
    );
    let feed = Arc::new(feed);
    let clock = ManualClock::at(date(2024, 1, 10));
    let (engine, db) = engine_with(feed.clone(), clock.clone());

    engine.run(incremental_run()).await.unwrap();
    assert_eq!(db.count_prices().unwrap(), 1);

    clock.advance_to(date(2024, 1, 12));
    feed.price_calls.lock().clear();
    engine.run(incremental_run()).await.unwrap();

    let calls = feed.price_calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, date(2024, 1, 11));
    assert_eq!(calls[0].2, date(2024, 1, 12));
}

#[tokio::test]
async fn up_to_date_instrument_skips_prices_but_refreshes_concepts() {
    let mut feed = MockFeed::default();
    feed.set_listings(&[("600000", "PuFa Bank")]);
    feed.prices.insert(
        "600000".to_string(),
        vec![bar("600000", date(2024, 1, 15), 10.0)],
    );
    feed.concepts
        .insert("600000".to_string(), vec!["Banking".to_string()]);
    let feed = Arc::new(feed);
    let clock = ManualClock::at(date(2024, 1, 15));
    let (engine, db) = engine_with(feed.clone(), clock);

    engine.run(incremental_run()).await.unwrap();
    feed.price_calls.lock().clear();
    feed.concept_calls.lock().clear();

    let summary = engine.run(incremental_run()).await.unwrap();

    assert!(feed.price_calls.lock().is_empty());
    assert_eq!(feed.concept_calls.lock().len(), 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(db.get_concepts("600000").unwrap().len(), 1);
}

#[tokio::test]
async fn enrichment_populates_market_industry_and_area() {
    let mut feed = MockFeed::default();
    feed.set_listings(&[("600000", "PuFa Bank")]);
    feed.directories.insert(
        Exchange::Shanghai,
        vec![DirectoryEntry {
            code: "600000".to_string(),
            name: Some("PuFa".to_string()),
            industry: Some("Banking".to_string()),
            area: Some("Shanghai".to_string()),
        }],
    );
    let feed = Arc::new(feed);
    let clock = ManualClock::at(date(2024, 1, 15));
    let (engine, db) = engine_with(feed, clock);

    engine.run(full_run()).await.unwrap();

    let stored = db.get_instrument("600000").unwrap().unwrap();
    // Primary name wins over the directory name
    assert_eq!(stored.name, "PuFa Bank");
    assert_eq!(stored.industry.as_deref(), Some("Banking"));
    assert_eq!(stored.area.as_deref(), Some("Shanghai"));
    assert_eq!(stored.market.as_deref(), Some("SH"));
}

#[tokio::test]
async fn pacing_pause_fires_after_every_fifth_instrument() {
    let mut feed = MockFeed::default();
    let codes: Vec<String> = (1..=12).map(|i| format!("{:06}", i)).collect();
    let listings: Vec<(&str, &str)> = codes.iter().map(|c| (c.as_str(), "X")).collect();
    feed.set_listings(&listings);
    let feed = Arc::new(feed);
    let clock = ManualClock::at(date(2024, 1, 15));
    let (engine, _db) = engine_with(feed, clock.clone());

    engine.run(full_run()).await.unwrap();

    // Every fetch succeeds immediately, so the only sleeps are pacing pauses:
    // after instruments 5 and 10, none after the final batch.
    assert_eq!(clock.sleeps.lock().len(), 2);
}
