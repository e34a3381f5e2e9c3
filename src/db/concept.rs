//! Concept board membership persistence
//!
//! Concept rows are additive across fetches; a duplicate `(code, concept)`
//! key is accepted as a no-op rather than aborting the batch.

use crate::db::models::ConceptTag;
use crate::error::Result;
use rusqlite::{params, Connection};

/// Insert concept tags, ignoring rows that already exist (one transaction)
pub fn append_concepts(conn: &mut Connection, tags: &[ConceptTag]) -> Result<usize> {
    let tx = conn.transaction()?;

    let mut stmt =
        tx.prepare("INSERT OR IGNORE INTO concepts (code, concept) VALUES (?1, ?2)")?;

    let mut inserted = 0;
    for tag in tags {
        inserted += stmt.execute(params![tag.code, tag.concept])?;
    }

    drop(stmt);
    tx.commit()?;

    Ok(inserted)
}

/// Query concept tags for one instrument
pub fn get_concepts(conn: &Connection, code: &str) -> Result<Vec<ConceptTag>> {
    let mut stmt =
        conn.prepare("SELECT code, concept FROM concepts WHERE code = ?1 ORDER BY concept")?;

    let tags = stmt
        .query_map(params![code], |row| {
            Ok(ConceptTag {
                code: row.get(0)?,
                concept: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(tags)
}
