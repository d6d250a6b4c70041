//! Canonical nutrient model
//!
//! One row per canonical nutrient. `name_id` is the dense canonical id
//! that fixes the position of every vector slot for the run.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// A canonical nutrient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientRecord {
    /// Primary key, assigned by the persistence coordinator
    pub id: Option<i64>,
    /// Dense canonical id, 0..N-1 in first-seen order
    pub name_id: u32,
    /// Canonical nutrient name
    pub name: String,
}

impl NutrientRecord {
    pub fn new(name_id: u32, name: impl Into<String>) -> Self {
        Self {
            id: None,
            name_id,
            name: name.into(),
        }
    }

    /// Create a NutrientRecord from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            name_id: row.get("name_id")?,
            name: row.get("name")?,
        })
    }

    /// List all nutrients in canonical (vector slot) order
    pub fn list_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM nutrients ORDER BY name_id ASC")?;
        let records = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Insert a batch of nutrients with their assigned primary keys
    pub fn insert_batch(conn: &Connection, records: &[Self]) -> DbResult<usize> {
        let mut stmt =
            conn.prepare("INSERT INTO nutrients (id, name_id, name) VALUES (?1, ?2, ?3)")?;

        let mut count = 0;
        for record in records {
            stmt.execute(params![record.id, record.name_id, record.name])?;
            count += 1;
        }

        Ok(count)
    }
}
