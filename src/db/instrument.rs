//! Instrument catalog persistence
//!
//! The catalog is a full snapshot of the latest list fetch: every refresh
//! clears the table and re-inserts, so delisted codes disappear on their own.

use crate::db::models::Instrument;
use crate::db::{date_to_text, text_to_date};
use crate::error::Result;
use rusqlite::{params, Connection};

/// Replace the entire instrument set (delete-all, insert-all, one transaction)
pub fn replace_instruments(conn: &mut Connection, instruments: &[Instrument]) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM instruments", [])?;

    let mut stmt = tx.prepare(
        "INSERT INTO instruments (code, name, industry, area, market, list_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for instrument in instruments {
        stmt.execute(params![
            instrument.code,
            instrument.name,
            instrument.industry,
            instrument.area,
            instrument.market,
            instrument.list_date.map(date_to_text),
        ])?;
    }

    drop(stmt);
    tx.commit()?;

    tracing::info!("Stored {} instruments", instruments.len());
    Ok(())
}

/// Load instruments in catalog order (by code)
pub fn load_instruments(conn: &Connection) -> Result<Vec<Instrument>> {
    let mut stmt = conn.prepare(
        "SELECT code, name, industry, area, market, list_date
         FROM instruments
         ORDER BY code",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut instruments = Vec::with_capacity(rows.len());
    for (code, name, industry, area, market, list_date) in rows {
        instruments.push(Instrument {
            code,
            name,
            industry,
            area,
            market,
            list_date: list_date.as_deref().map(text_to_date).transpose()?,
        });
    }

    Ok(instruments)
}

/// Get a single instrument by code
pub fn get_instrument(conn: &Connection, code: &str) -> Result<Option<Instrument>> {
    let mut stmt = conn.prepare(
        "SELECT code, name, industry, area, market, list_date
         FROM instruments
         WHERE code = ?1",
    )?;

    let row = stmt
        .query_map(params![code], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .next()
        .transpose()?;

    match row {
        Some((code, name, industry, area, market, list_date)) => Ok(Some(Instrument {
            code,
            name,
            industry,
            area,
            market,
            list_date: list_date.as_deref().map(text_to_date).transpose()?,
        })),
        None => Ok(None),
    }
}

/// Get instrument count
pub fn count_instruments(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM instruments", [], |row| row.get(0))?;
    Ok(count)
}
