//! Shared resolution context
//!
//! The mutable accumulator threaded through the sequential resolution
//! stages. Owned exclusively by the orchestrating task from the moment
//! the parallel loads resolve until final persistence.

use std::collections::HashMap;

use super::aliases::AliasMap;
use super::registry::CanonicalRegistry;

/// A USDA nutrient mapping: canonical slot plus unit multiplier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsdaNutrient {
    pub name_id: u32,
    pub multiplier: f64,
}

/// Lookup tables resolved from the USDA sheets
#[derive(Debug, Clone, Default)]
pub struct UsdaTables {
    /// food id -> grams per serving
    pub foods: HashMap<i64, f64>,
    /// external nutrient id -> canonical mapping
    pub nutrients: HashMap<i64, UsdaNutrient>,
}

/// Everything the resolution stages accumulate before record building
#[derive(Debug, Clone)]
pub struct IngestContext {
    pub registry: CanonicalRegistry,
    pub aliases: AliasMap,
    /// Agile column name -> multiplier
    pub column_multipliers: HashMap<String, f64>,
    pub usda: UsdaTables,
}

impl IngestContext {
    pub fn new(registry: CanonicalRegistry) -> Self {
        Self {
            registry,
            aliases: AliasMap::new(),
            column_multipliers: HashMap::new(),
            usda: UsdaTables::default(),
        }
    }
}
