//! Fetch window planning
//!
//! Bounds each provider call to the dates still missing locally: an
//! instrument with stored history only re-fetches from the day after its
//! watermark, independent of how much history already exists.

use chrono::NaiveDate;

/// Per-instrument fetch instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// No local history: fetch the whole configured window
    Full { start: NaiveDate, end: NaiveDate },
    /// Local history ends before today: fetch only the unseen tail
    Incremental { start: NaiveDate, end: NaiveDate },
    /// The watermark already covers today; nothing new can exist
    UpToDate,
}

impl FetchPlan {
    /// Date range to request, if any
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            FetchPlan::Full { start, end } | FetchPlan::Incremental { start, end } => {
                Some((start, end))
            }
            FetchPlan::UpToDate => None,
        }
    }
}

/// Plan the fetch window for one instrument
pub fn plan_fetch(today: NaiveDate, watermark: Option<NaiveDate>, floor: NaiveDate) -> FetchPlan {
    match watermark {
        None => FetchPlan::Full {
            start: floor,
            end: today,
        },
        Some(watermark) => {
            let start = watermark + chrono::Duration::days(1);
            if start > today {
                FetchPlan::UpToDate
            } else {
                FetchPlan::Incremental { start, end: today }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn no_watermark_plans_the_full_window() {
        let plan = plan_fetch(date(2024, 1, 15), None, date(1990, 12, 19));
        assert_eq!(
            plan,
            FetchPlan::Full {
                start: date(1990, 12, 19),
                end: date(2024, 1, 15),
            }
        );
    }

    #[test]
    fn watermark_shrinks_the_window_to_the_unseen_tail() {
        let plan = plan_fetch(date(2024, 1, 15), Some(date(2024, 1, 10)), date(1990, 12, 19));
        assert_eq!(
            plan,
            FetchPlan::Incremental {
                start: date(2024, 1, 11),
                end: date(2024, 1, 15),
            }
        );
    }

    #[test]
    fn watermark_at_today_is_up_to_date() {
        let plan = plan_fetch(date(2024, 1, 15), Some(date(2024, 1, 15)), date(1990, 12, 19));
        assert_eq!(plan, FetchPlan::UpToDate);
        assert_eq!(plan.window(), None);
    }

    #[test]
    fn watermark_past_today_is_up_to_date() {
        let plan = plan_fetch(date(2024, 1, 15), Some(date(2024, 1, 16)), date(1990, 12, 19));
        assert_eq!(plan, FetchPlan::UpToDate);
    }

    #[test]
    fn watermark_yesterday_plans_a_single_day() {
        let plan = plan_fetch(date(2024, 1, 15), Some(date(2024, 1, 14)), date(1990, 12, 19));
        assert_eq!(
            plan,
            FetchPlan::Incremental {
                start: date(2024, 1, 15),
                end: date(2024, 1, 15),
            }
        );
    }
}
