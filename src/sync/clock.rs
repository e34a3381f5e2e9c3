//! Clock abstraction
//!
//! "Today" and every wait go through this trait so window planning, retry
//! backoff and pacing are deterministic under test.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Shanghai;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current date in exchange-local time
    fn today(&self) -> NaiveDate;

    /// Suspend execution for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation; dates are evaluated in Asia/Shanghai
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&Shanghai).date_naive()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
