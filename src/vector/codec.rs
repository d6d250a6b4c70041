//! Encoded nutrient vector codec
//!
//! Serializes one record's per-nutrient values into a fixed-length,
//! comma-joined string with one cell per canonical id, in registry
//! order. The blob is what the `nutrient_data` table stores.

use std::collections::HashMap;
use std::num::ParseFloatError;

use serde::{Deserialize, Serialize};

use super::cell::NutrientCell;

/// Delimiter between vector cells
pub const CELL_DELIMITER: char = ',';

/// A serialized nutrient vector, one cell per canonical id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedVector(String);

impl EncodedVector {
    /// Wrap an already-encoded blob (e.g. read back from the database)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw wire form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of cells in the vector
    pub fn cell_count(&self) -> usize {
        self.0.split(CELL_DELIMITER).count()
    }

    /// Decode into per-slot floats, positionally indexed by canonical id.
    ///
    /// The empty cell reads as 0.0 and `-1` as -1.0; anything else must
    /// parse as a float.
    pub fn decode(&self) -> Result<Vec<f64>, ParseFloatError> {
        self.0
            .split(CELL_DELIMITER)
            .map(|cell| match cell {
                "" => Ok(0.0),
                "-1" => Ok(-1.0),
                other => other.parse::<f64>(),
            })
            .collect()
    }
}

impl std::fmt::Display for EncodedVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode pre-rendered cell strings, one per canonical id in `ids` order.
/// Ids absent from `values` emit the empty marker.
pub fn encode(values: &HashMap<u32, String>, ids: &[u32]) -> EncodedVector {
    let cells: Vec<&str> = ids
        .iter()
        .map(|id| values.get(id).map(String::as_str).unwrap_or(""))
        .collect();
    EncodedVector(cells.join(&CELL_DELIMITER.to_string()))
}

/// Encode tagged cells, one per canonical id in `ids` order.
/// Ids absent from `cells` are treated as not listed.
pub fn encode_cells(cells: &HashMap<u32, NutrientCell>, ids: &[u32]) -> EncodedVector {
    let rendered: Vec<String> = ids
        .iter()
        .map(|id| {
            cells
                .get(id)
                .map(NutrientCell::render)
                .unwrap_or_default()
        })
        .collect();
    EncodedVector(rendered.join(&CELL_DELIMITER.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<u32> {
        (0..n).collect()
    }

    #[test]
    fn test_encode_fills_missing_slots() {
        let mut values = HashMap::new();
        values.insert(0, "10.0".to_string());
        let encoded = encode(&values, &ids(3));
        assert_eq!(encoded.as_str(), "10.0,,");
        assert_eq!(encoded.cell_count(), 3);
    }

    #[test]
    fn test_encode_cells() {
        let mut cells = HashMap::new();
        cells.insert(0, NutrientCell::Numeric(10.0));
        cells.insert(2, NutrientCell::NotDetermined);
        let encoded = encode_cells(&cells, &ids(3));
        assert_eq!(encoded.as_str(), "10.0,,-1");
    }

    #[test]
    fn test_decode_sentinels() {
        let encoded = EncodedVector::from_raw("10.0,,-1");
        assert_eq!(encoded.decode().unwrap(), vec![10.0, 0.0, -1.0]);
    }

    #[test]
    fn test_decode_length_matches_registry() {
        let mut values = HashMap::new();
        values.insert(1, "0.5".to_string());
        let encoded = encode(&values, &ids(5));
        assert_eq!(encoded.decode().unwrap().len(), 5);
    }

    #[test]
    fn test_round_trip_identity_on_nonzero_cells() {
        let mut cells = HashMap::new();
        cells.insert(0, NutrientCell::Numeric(123.456789));
        cells.insert(1, NutrientCell::Numeric(0.000001));
        cells.insert(3, NutrientCell::Numeric(42.0));
        let decoded = encode_cells(&cells, &ids(4)).decode().unwrap();
        assert_eq!(decoded, vec![123.456789, 0.000001, 0.0, 42.0]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(EncodedVector::from_raw("1.0,abc").decode().is_err());
    }
}
