//! Passive write-only tables: model training records and user feedback

use crate::db::models::{FeedbackEntry, TrainingRecord};
use crate::error::Result;
use rusqlite::{params, Connection};

/// Record one model training run
pub fn insert_training_record(conn: &Connection, record: &TrainingRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO model_training_records (model_name, metrics, parameters, performance_score)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            record.model_name,
            record.metrics,
            record.parameters,
            record.performance_score,
        ],
    )?;

    tracing::info!("Stored training record for model {}", record.model_name);
    Ok(())
}

/// Record one user feedback entry
pub fn insert_feedback(conn: &Connection, entry: &FeedbackEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO user_feedback (feedback_type, content, related_stock, rating)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            entry.feedback_type,
            entry.content,
            entry.related_stock,
            entry.rating,
        ],
    )?;

    Ok(())
}
