//! Run configuration
//!
//! Defaults mirror the public Eastmoney quote API limits: three attempts per
//! call with a doubling backoff, and a three second pause after every five
//! instruments.

use std::time::Duration;

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::sync::limiter::PaceLimiter;
use crate::sync::retry::RetryPolicy;

/// Earliest session the A-share market has data for.
pub fn earliest_session() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 12, 19).expect("valid constant date")
}

/// How far back a full download reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HistoryPeriod {
    #[value(name = "1year")]
    OneYear,
    #[value(name = "3year")]
    ThreeYears,
    #[value(name = "5year")]
    FiveYears,
    #[value(name = "all")]
    All,
}

impl HistoryPeriod {
    /// First date a full-window fetch starts from, relative to `today`.
    pub fn floor(&self, today: NaiveDate) -> NaiveDate {
        match self {
            HistoryPeriod::OneYear => today - chrono::Duration::days(365),
            HistoryPeriod::ThreeYears => today - chrono::Duration::days(1095),
            HistoryPeriod::FiveYears => today - chrono::Duration::days(1825),
            HistoryPeriod::All => earliest_session(),
        }
    }
}

/// Configuration for one synchronizer instance.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Retry policy applied to every feed call.
    pub retry: RetryPolicy,
    /// Pause cadence across the instrument loop.
    pub pacing: PaceLimiter,
    /// Concept tags retained per instrument per fetch.
    pub concept_cap: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::new(3, Duration::from_secs(2), 2.0),
            pacing: PaceLimiter::new(5, Duration::from_secs(3)),
            concept_cap: 10,
        }
    }
}
