//! SQLite database module

pub mod models;
mod concept;
mod feedback;
mod instrument;
mod migrations;
mod price;

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use chrono::NaiveDate;
use models::{ConceptTag, FeedbackEntry, Instrument, PriceBar, TrainingRecord};
use parking_lot::Mutex;
use rusqlite::Connection;

/// SQLite database wrapper
pub struct StockDb {
    conn: Mutex<Connection>,
}

impl StockDb {
    /// Create new SQLite database connection
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        // Run migrations
        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (tests and dry runs)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    // ========== Instrument Methods ==========

    /// Replace the entire instrument catalog
    pub fn replace_instruments(&self, instruments: &[Instrument]) -> Result<()> {
        let mut conn = self.conn.lock();
        instrument::replace_instruments(&mut conn, instruments)
    }

    /// Load the instrument catalog in code order
    pub fn load_instruments(&self) -> Result<Vec<Instrument>> {
        let conn = self.conn.lock();
        instrument::load_instruments(&conn)
    }

    /// Get one instrument by code
    pub fn get_instrument(&self, code: &str) -> Result<Option<Instrument>> {
        let conn = self.conn.lock();
        instrument::get_instrument(&conn, code)
    }

    /// Get instrument count
    pub fn count_instruments(&self) -> Result<i64> {
        let conn = self.conn.lock();
        instrument::count_instruments(&conn)
    }

    // ========== Price Methods ==========

    /// Insert or replace daily bars keyed by `(code, date)`
    pub fn upsert_prices(&self, bars: &[PriceBar]) -> Result<usize> {
        let mut conn = self.conn.lock();
        price::upsert_prices(&mut conn, bars)
    }

    /// Latest stored trade date per instrument, one pass
    pub fn latest_trade_dates(&self) -> Result<HashMap<String, NaiveDate>> {
        let conn = self.conn.lock();
        price::latest_trade_dates(&conn)
    }

    /// Query bars for one instrument, ordered by date ascending
    pub fn get_prices(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>> {
        let conn = self.conn.lock();
        price::get_prices(&conn, code, start_date, end_date)
    }

    /// Total bar count
    pub fn count_prices(&self) -> Result<i64> {
        let conn = self.conn.lock();
        price::count_prices(&conn)
    }

    // ========== Concept Methods ==========

    /// Append concept tags; duplicates are no-ops
    pub fn append_concepts(&self, tags: &[ConceptTag]) -> Result<usize> {
        let mut conn = self.conn.lock();
        concept::append_concepts(&mut conn, tags)
    }

    /// Query concept tags for one instrument
    pub fn get_concepts(&self, code: &str) -> Result<Vec<ConceptTag>> {
        let conn = self.conn.lock();
        concept::get_concepts(&conn, code)
    }

    // ========== Passive Tables ==========

    /// Record a model training run
    pub fn insert_training_record(&self, record: &TrainingRecord) -> Result<()> {
        let conn = self.conn.lock();
        feedback::insert_training_record(&conn, record)
    }

    /// Record a user feedback entry
    pub fn insert_feedback(&self, entry: &FeedbackEntry) -> Result<()> {
        let conn = self.conn.lock();
        feedback::insert_feedback(&conn, entry)
    }
}

/// Date column format used across all tables
fn date_to_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn text_to_date(text: &str) -> crate::error::Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(text, "%Y-%m-%d")?)
}
