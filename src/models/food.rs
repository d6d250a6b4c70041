//! Food model
//!
//! One row per ingested food across both sources, with its encoded
//! nutrient vector as a 1:1 child.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::vector::EncodedVector;

use super::NutrientData;

/// Which source file a food came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodSource {
    /// USDA FoodData Central lookup
    Usda,
    /// The agile formulation workbook
    Agile,
}

impl FoodSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodSource::Usda => "usda",
            FoodSource::Agile => "agile",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "usda" => FoodSource::Usda,
            _ => FoodSource::Agile,
        }
    }
}

/// A food with its nutrient vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodRecord {
    /// Primary key, assigned by the persistence coordinator
    pub id: Option<i64>,
    /// External identifier (FDC id or formula id)
    pub food_id: String,
    pub description: String,
    pub source: FoodSource,
    /// Grams per serving; only USDA foods carry one
    pub qty_per_serving: Option<f64>,
    /// The 1:1 vector child
    pub nutrients: NutrientData,
}

impl FoodRecord {
    pub fn new(
        food_id: impl Into<String>,
        description: impl Into<String>,
        source: FoodSource,
        qty_per_serving: Option<f64>,
        vector: EncodedVector,
    ) -> Self {
        Self {
            id: None,
            food_id: food_id.into(),
            description: description.into(),
            source,
            qty_per_serving,
            nutrients: NutrientData::new(vector),
        }
    }

    /// Stamp the parent key and the vector child's key before writing;
    /// the child also receives the parent's key as its foreign key.
    pub fn set_keys(&mut self, pk: i64, vector_pk: i64) {
        self.id = Some(pk);
        self.nutrients.id = Some(vector_pk);
        self.nutrients.food_id = Some(pk);
    }

    /// Create a FoodRecord from a joined food + nutrient_data row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            food_id: row.get("food_id")?,
            description: row.get("description")?,
            source: FoodSource::from_str(row.get::<_, String>("source")?.as_str()),
            qty_per_serving: row.get("qty_per_serving")?,
            nutrients: NutrientData {
                id: Some(row.get("nd_id")?),
                food_id: Some(row.get("id")?),
                region_id: None,
                data: EncodedVector::from_raw(row.get::<_, String>("data")?),
            },
        })
    }

    /// List all foods with their vectors, in key order
    pub fn list_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT f.id, f.food_id, f.description, f.source, f.qty_per_serving,
                   nd.id AS nd_id, nd.data
            FROM foods f
            JOIN nutrient_data nd ON nd.food_id = f.id
            ORDER BY f.id ASC
            "#,
        )?;
        let records = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Search foods by external id or description substring
    pub fn search(conn: &Connection, term: &str) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", term);
        let mut stmt = conn.prepare(
            r#"
            SELECT f.id, f.food_id, f.description, f.source, f.qty_per_serving,
                   nd.id AS nd_id, nd.data
            FROM foods f
            JOIN nutrient_data nd ON nd.food_id = f.id
            WHERE f.food_id LIKE ?1 OR f.description LIKE ?1
            ORDER BY f.id ASC
            "#,
        )?;
        let records = stmt
            .query_map([&pattern], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Insert a batch of food parent rows with their assigned keys.
    /// Vector children are written separately, before the parents.
    pub fn insert_batch(conn: &Connection, records: &[Self]) -> DbResult<usize> {
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO foods (id, food_id, description, source, qty_per_serving)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;

        let mut count = 0;
        for record in records {
            stmt.execute(params![
                record.id,
                record.food_id,
                record.description,
                record.source.as_str(),
                record.qty_per_serving,
            ])?;
            count += 1;
        }

        Ok(count)
    }
}
