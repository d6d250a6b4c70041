//! Nutrient cell values and numeric helpers
//!
//! A cell is one slot of an encoded nutrient vector. The wire format
//! overloads two sentinels: the empty string covers both a true zero and
//! a value that was never listed, and `-1` marks a guidance level that
//! was never determined. In memory the three cases stay distinct.

/// Decimal places kept for every stored nutrient value
pub const VALUE_DECIMALS: i32 = 6;

/// One slot of a nutrient vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NutrientCell {
    /// A measured amount or guidance limit
    Numeric(f64),
    /// No value listed for this nutrient
    NotListed,
    /// Guidance level exists but was never determined (limits only)
    NotDetermined,
}

impl NutrientCell {
    /// Render the cell in wire form.
    ///
    /// `Numeric(0.0)` renders as `"0.0"`, not the empty marker; callers
    /// that want the zero collapse map zeros to `NotListed` first.
    pub fn render(&self) -> String {
        match self {
            NutrientCell::Numeric(v) => format_amount(round_value(*v)),
            NutrientCell::NotListed => String::new(),
            NutrientCell::NotDetermined => "-1".to_string(),
        }
    }
}

/// Round a value to the stored precision (6 decimals)
pub fn round_value(v: f64) -> f64 {
    let factor = 10f64.powi(VALUE_DECIMALS);
    (v * factor).round() / factor
}

/// Format an amount the way the wire format expects
///
/// Integral values keep a trailing `.0` (`10` renders as `"10.0"`),
/// fractional values use the shortest exact representation.
pub fn format_amount(v: f64) -> String {
    if v == v.trunc() {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}
