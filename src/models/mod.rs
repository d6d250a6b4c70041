//! Data models
//!
//! Rust structs representing database entities.

mod food;
mod nutrient;
mod nutrient_data;
mod region;

pub use food::{FoodRecord, FoodSource};
pub use nutrient::NutrientRecord;
pub use nutrient_data::NutrientData;
pub use region::RegionRecord;
