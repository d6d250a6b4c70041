//! Nutrient vector module
//!
//! Tagged cell values and the encode/decode codec for the stored
//! vector blobs.

pub mod cell;
pub mod codec;

pub use cell::{format_amount, round_value, NutrientCell, VALUE_DECIMALS};
pub use codec::{encode, encode_cells, EncodedVector, CELL_DELIMITER};
