//! Daily schedule driver
//!
//! Triggers one incremental update per day at a configured time of day,
//! evaluated in exchange-local time (Asia/Shanghai). Each run is awaited
//! before the next wait starts, so triggered runs never overlap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Timelike, Utc};
use chrono_tz::Asia::Shanghai;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::sync::{Clock, SyncEngine};

pub struct ScheduleDriver {
    engine: SyncEngine,
    clock: Arc<dyn Clock>,
    update_time: NaiveTime,
}

impl ScheduleDriver {
    pub fn new(engine: SyncEngine, clock: Arc<dyn Clock>, update_time: NaiveTime) -> Self {
        Self {
            engine,
            clock,
            update_time,
        }
    }

    /// Parse a `HH:MM` schedule time
    pub fn parse_time(value: &str) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .map_err(|_| AppError::Config(format!("invalid schedule time '{}', expected HH:MM", value)))
    }

    /// Duration from `now` until the next occurrence of `target`
    fn duration_until(now: NaiveTime, target: NaiveTime) -> Duration {
        let duration_secs = if now < target {
            // Target is later today
            (target - now).num_seconds() as u64
        } else {
            // Target is tomorrow
            let until_midnight = (24 * 3600) - now.num_seconds_from_midnight() as u64;
            until_midnight + target.num_seconds_from_midnight() as u64
        };

        Duration::from_secs(duration_secs)
    }

    /// Block forever, running one daily update per trigger
    pub async fn run(&self) -> Result<()> {
        info!(
            "Daily update scheduled at {} exchange-local time",
            self.update_time.format("%H:%M")
        );

        loop {
            let now = Utc::now().with_timezone(&Shanghai).time();
            let wait = Self::duration_until(now, self.update_time);
            info!(
                "Next update in {} hours {} minutes",
                wait.as_secs() / 3600,
                (wait.as_secs() % 3600) / 60
            );

            self.clock.sleep(wait).await;

            match self.engine.daily_update().await {
                Ok(summary) => info!(
                    "Scheduled update finished - {} succeeded, {} failed",
                    summary.succeeded, summary.failed
                ),
                Err(e) => error!("Scheduled update failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn target_later_today() {
        let wait = ScheduleDriver::duration_until(time(8, 0), time(9, 0));
        assert_eq!(wait, Duration::from_secs(3600));
    }

    #[test]
    fn target_already_passed_rolls_to_tomorrow() {
        let wait = ScheduleDriver::duration_until(time(10, 0), time(9, 0));
        assert_eq!(wait, Duration::from_secs(23 * 3600));
    }

    #[test]
    fn trigger_time_itself_waits_a_full_day() {
        let wait = ScheduleDriver::duration_until(time(9, 0), time(9, 0));
        assert_eq!(wait, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn parse_accepts_hh_mm_only() {
        assert_eq!(ScheduleDriver::parse_time("09:00").unwrap(), time(9, 0));
        assert!(ScheduleDriver::parse_time("9am").is_err());
    }
}
