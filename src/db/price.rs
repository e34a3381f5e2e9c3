//! Daily price persistence and watermark lookup

use std::collections::HashMap;

use crate::db::models::PriceBar;
use crate::db::{date_to_text, text_to_date};
use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, ToSql};

/// Insert or fully replace bars keyed by `(code, date)` (one transaction)
pub fn upsert_prices(conn: &mut Connection, bars: &[PriceBar]) -> Result<usize> {
    let tx = conn.transaction()?;

    let mut stmt = tx.prepare(
        "INSERT INTO prices (code, date, open, high, low, close, volume, amount, pct_change, turnover_rate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT (code, date) DO UPDATE SET
           open = excluded.open, high = excluded.high, low = excluded.low,
           close = excluded.close, volume = excluded.volume, amount = excluded.amount,
           pct_change = excluded.pct_change, turnover_rate = excluded.turnover_rate",
    )?;

    let mut count = 0;
    for bar in bars {
        stmt.execute(params![
            bar.code,
            date_to_text(bar.date),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
            bar.amount,
            bar.pct_change,
            bar.turnover_rate,
        ])?;
        count += 1;
    }

    drop(stmt);
    tx.commit()?;

    Ok(count)
}

/// Latest stored trade date per instrument, resolved in one pass
///
/// Codes with no rows are simply absent from the map.
pub fn latest_trade_dates(conn: &Connection) -> Result<HashMap<String, NaiveDate>> {
    let mut stmt = conn.prepare("SELECT code, MAX(date) FROM prices GROUP BY code")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut dates = HashMap::with_capacity(rows.len());
    for (code, date) in rows {
        dates.insert(code, text_to_date(&date)?);
    }

    Ok(dates)
}

/// Query bars for one instrument, optionally bounded, ordered by date ascending
pub fn get_prices(
    conn: &Connection,
    code: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Vec<PriceBar>> {
    let mut sql = String::from(
        "SELECT code, date, open, high, low, close, volume, amount, pct_change, turnover_rate
         FROM prices
         WHERE code = ?1",
    );
    let start_text = start_date.map(date_to_text);
    let end_text = end_date.map(date_to_text);
    let mut bind: Vec<&dyn ToSql> = vec![&code];

    if let Some(start) = start_text.as_ref() {
        sql.push_str(&format!(" AND date >= ?{}", bind.len() + 1));
        bind.push(start);
    }
    if let Some(end) = end_text.as_ref() {
        sql.push_str(&format!(" AND date <= ?{}", bind.len() + 1));
        bind.push(end);
    }
    sql.push_str(" ORDER BY date ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(bind.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, Option<f64>>(7)?,
                row.get::<_, Option<f64>>(8)?,
                row.get::<_, Option<f64>>(9)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut bars = Vec::with_capacity(rows.len());
    for (code, date, open, high, low, close, volume, amount, pct_change, turnover_rate) in rows {
        bars.push(PriceBar {
            code,
            date: text_to_date(&date)?,
            open,
            high,
            low,
            close,
            volume,
            amount,
            pct_change,
            turnover_rate,
        });
    }

    Ok(bars)
}

/// Get total bar count
pub fn count_prices(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM prices", [], |row| row.get(0))?;
    Ok(count)
}
