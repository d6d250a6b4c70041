//! Nutrient vector child model
//!
//! The 1:1 child row carrying one record's encoded vector. Exactly one
//! of `food_id`/`region_id` is set once keys are assigned.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::vector::EncodedVector;

/// An encoded nutrient vector attached to a food or a region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientData {
    /// Primary key, assigned by the persistence coordinator
    pub id: Option<i64>,
    /// Owning food, for amount vectors
    pub food_id: Option<i64>,
    /// Owning region, for limit vectors
    pub region_id: Option<i64>,
    /// The encoded vector blob
    pub data: EncodedVector,
}

impl NutrientData {
    pub fn new(data: EncodedVector) -> Self {
        Self {
            id: None,
            food_id: None,
            region_id: None,
            data,
        }
    }

    /// Create a NutrientData from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            food_id: row.get("food_id")?,
            region_id: row.get("region_id")?,
            data: EncodedVector::from_raw(row.get::<_, String>("data")?),
        })
    }

    /// Fetch the vector child of a food
    pub fn for_food(conn: &Connection, food_id: i64) -> DbResult<Option<Self>> {
        Self::for_owner(conn, "food_id", food_id)
    }

    /// Fetch the vector child of a region
    pub fn for_region(conn: &Connection, region_id: i64) -> DbResult<Option<Self>> {
        Self::for_owner(conn, "region_id", region_id)
    }

    fn for_owner(conn: &Connection, column: &str, owner_id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM nutrient_data WHERE {} = ?1",
            column
        ))?;
        let result = stmt.query_row([owner_id], Self::from_row);
        match result {
            Ok(data) => Ok(Some(data)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a batch of vector children with their assigned keys
    pub fn insert_batch<'a, I>(conn: &Connection, records: I) -> DbResult<usize>
    where
        I: IntoIterator<Item = &'a NutrientData>,
    {
        let mut stmt = conn.prepare(
            "INSERT INTO nutrient_data (id, data, food_id, region_id) VALUES (?1, ?2, ?3, ?4)",
        )?;

        let mut count = 0;
        for record in records {
            stmt.execute(params![
                record.id,
                record.data.as_str(),
                record.food_id,
                record.region_id,
            ])?;
            count += 1;
        }

        Ok(count)
    }
}
