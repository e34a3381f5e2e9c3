//! Database models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Instrument reference data, replaced wholesale on every catalog refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub code: String,
    pub name: String,
    pub industry: Option<String>,
    pub area: Option<String>,
    pub market: Option<String>,
    pub list_date: Option<NaiveDate>,
}

/// One daily OHLCV bar, keyed by `(code, date)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: Option<f64>,
    pub pct_change: Option<f64>,
    pub turnover_rate: Option<f64>,
}

/// Concept board membership, keyed by `(code, concept)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptTag {
    pub code: String,
    pub concept: String,
}

/// Model training record (passive storage, written by the analysis side)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub model_name: String,
    pub metrics: String,
    pub parameters: String,
    pub performance_score: f64,
}

/// Free-text user feedback (passive storage)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub feedback_type: String,
    pub content: String,
    pub related_stock: Option<String>,
    pub rating: Option<i64>,
}
