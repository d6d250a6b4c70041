//! Region model
//!
//! One row per geographic/regulatory region; the vector child holds
//! guidance limits, not amounts.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::vector::EncodedVector;

use super::NutrientData;

/// A region with its nutrient guidance limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Primary key, assigned by the persistence coordinator
    pub id: Option<i64>,
    pub name: String,
    /// Citation for the limits data
    pub source: String,
    /// The 1:1 limit vector child
    pub limits: NutrientData,
}

impl RegionRecord {
    pub fn new(name: impl Into<String>, source: impl Into<String>, vector: EncodedVector) -> Self {
        Self {
            id: None,
            name: name.into(),
            source: source.into(),
            limits: NutrientData::new(vector),
        }
    }

    /// Stamp the parent key and the vector child's key before writing;
    /// the child also receives the parent's key as its foreign key.
    pub fn set_keys(&mut self, pk: i64, vector_pk: i64) {
        self.id = Some(pk);
        self.limits.id = Some(vector_pk);
        self.limits.region_id = Some(pk);
    }

    /// Create a RegionRecord from a joined region + nutrient_data row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            source: row.get("source")?,
            limits: NutrientData {
                id: Some(row.get("nd_id")?),
                food_id: None,
                region_id: Some(row.get("id")?),
                data: EncodedVector::from_raw(row.get::<_, String>("data")?),
            },
        })
    }

    /// List all regions with their limit vectors, in key order
    pub fn list_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT r.id, r.name, r.source, nd.id AS nd_id, nd.data
            FROM regions r
            JOIN nutrient_data nd ON nd.region_id = r.id
            ORDER BY r.id ASC
            "#,
        )?;
        let records = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Insert a batch of region parent rows with their assigned keys.
    /// Vector children are written separately, before the parents.
    pub fn insert_batch(conn: &Connection, records: &[Self]) -> DbResult<usize> {
        let mut stmt =
            conn.prepare("INSERT INTO regions (id, name, source) VALUES (?1, ?2, ?3)")?;

        let mut count = 0;
        for record in records {
            stmt.execute(params![record.id, record.name, record.source])?;
            count += 1;
        }

        Ok(count)
    }
}
