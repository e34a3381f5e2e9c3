//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    // Run each migration
    run_migration(conn, "001_instruments", CREATE_INSTRUMENTS_TABLE)?;
    run_migration(conn, "002_prices", CREATE_PRICES_TABLE)?;
    run_migration(conn, "003_concepts", CREATE_CONCEPTS_TABLE)?;
    run_migration(conn, "004_model_training_records", CREATE_TRAINING_RECORDS_TABLE)?;
    run_migration(conn, "005_user_feedback", CREATE_USER_FEEDBACK_TABLE)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    // Check if migration already applied
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_INSTRUMENTS_TABLE: &str = r#"
CREATE TABLE instruments (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    industry TEXT,
    area TEXT,
    market TEXT,
    list_date TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const CREATE_PRICES_TABLE: &str = r#"
CREATE TABLE prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    date TEXT NOT NULL,
    open REAL,
    high REAL,
    low REAL,
    close REAL,
    volume REAL,
    amount REAL,
    pct_change REAL,
    turnover_rate REAL,
    UNIQUE(code, date)
);
CREATE INDEX IF NOT EXISTS idx_prices_code ON prices(code);
CREATE INDEX IF NOT EXISTS idx_prices_date ON prices(date);
"#;

const CREATE_CONCEPTS_TABLE: &str = r#"
CREATE TABLE concepts (
    code TEXT NOT NULL,
    concept TEXT NOT NULL,
    PRIMARY KEY (code, concept)
);
"#;

const CREATE_TRAINING_RECORDS_TABLE: &str = r#"
CREATE TABLE model_training_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_name TEXT NOT NULL,
    training_date TEXT NOT NULL DEFAULT (datetime('now')),
    metrics TEXT,
    parameters TEXT,
    performance_score REAL
);
"#;

const CREATE_USER_FEEDBACK_TABLE: &str = r#"
CREATE TABLE user_feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feedback_type TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL DEFAULT (datetime('now')),
    related_stock TEXT,
    rating INTEGER
);
"#;
