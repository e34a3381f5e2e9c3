//! stocksync - A-share market data synchronizer
//!
//! Downloads the instrument catalog, daily OHLCV history and concept board
//! membership from the public Eastmoney quote API into a local SQLite
//! database, with full backfill, incremental daily refresh and a schedule
//! driver for unattended operation.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod scheduler;
pub mod sync;
