//! Agile workbook resolution
//!
//! The second workbook is one wide sheet: a food identifier column, a
//! description column, and one column per source nutrient label. Every
//! nutrient header must already be aliased; columns aliasing to the
//! same canonical nutrient are summed, not overwritten.

use std::collections::HashMap;
use std::collections::HashSet;

use tracing::{error, info};

use crate::models::{FoodRecord, FoodSource};
use crate::vector::{encode_cells, round_value, NutrientCell};

use super::context::IngestContext;
use super::error::{IngestResult, ValidationError};
use super::workbook::{Sheet, SheetSpec};

pub const SHEET_AGILE: &str = "Sheet1";

/// Identifier and description columns precede the nutrient columns
const NUTRIENT_START_COLUMN: usize = 2;

/// The sheets required from the agile workbook
pub fn agile_sheet_specs() -> Vec<SheetSpec> {
    vec![SheetSpec::all_columns(SHEET_AGILE)]
}

/// Build one food record per agile row, with summed nutrient vectors.
pub fn build_agile_foods(sheet: &Sheet, ctx: &IngestContext) -> IngestResult<Vec<FoodRecord>> {
    let run = || -> Result<Vec<FoodRecord>, ValidationError> {
        let headers = sheet.headers();
        if headers.len() < NUTRIENT_START_COLUMN {
            return Err(ValidationError::new(
                "expected a food identifier column and a description column",
            ));
        }
        let id_header = &headers[0];

        // Duplicate identifier rows are always fatal, regardless of
        // whether the other cell values match
        let mut seen: HashSet<String> = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        for (_, cells) in sheet.rows() {
            let food_id = sheet.cell(cells, 0).display();
            if !seen.insert(food_id.clone()) {
                duplicates.push(food_id);
            }
        }
        if !duplicates.is_empty() {
            for duplicate in &duplicates {
                error!("{} `{}` duplicated", id_header, duplicate);
            }
            return Err(ValidationError::new(format!(
                "one or more `{}` values are duplicated",
                id_header
            )));
        }

        // Resolve every nutrient column up front; the header row is row 1
        let mut columns: Vec<(usize, &str, u32, f64)> =
            Vec::with_capacity(headers.len().saturating_sub(NUTRIENT_START_COLUMN));
        for (index, header) in headers.iter().enumerate().skip(NUTRIENT_START_COLUMN) {
            let target = ctx.aliases.check_is_aliased(1, header)?;
            let multiplier = ctx.column_multipliers.get(header).copied().unwrap_or(1.0);
            columns.push((index, header.as_str(), target.name_id, multiplier));
        }

        let slot_count = ctx.registry.len();
        let ids = ctx.registry.ids();
        let mut foods = Vec::with_capacity(sheet.row_count());

        for (row, cells) in sheet.rows() {
            let food_id = sheet.cell(cells, 0).display();
            let description = sheet.cell(cells, 1).display();

            let mut amounts = vec![0.0f64; slot_count];
            for &(index, header, name_id, multiplier) in &columns {
                let cell = sheet.cell(cells, index);
                let value = if cell.is_empty() {
                    0.0
                } else {
                    cell.as_f64().ok_or_else(|| {
                        ValidationError::at_row(
                            row,
                            format!("value for `{}` is not a number", header),
                        )
                    })?
                };
                amounts[name_id as usize] += value * multiplier;
            }

            // Round, then collapse zeros to the empty marker
            let mut vector_cells: HashMap<u32, NutrientCell> = HashMap::new();
            for (slot, amount) in amounts.iter().enumerate() {
                let rounded = round_value(*amount);
                if rounded != 0.0 {
                    vector_cells.insert(slot as u32, NutrientCell::Numeric(rounded));
                }
            }

            foods.push(FoodRecord::new(
                food_id,
                description,
                FoodSource::Agile,
                None,
                encode_cells(&vector_cells, &ids),
            ));
        }

        info!("built {} agile food vectors", foods.len());
        Ok(foods)
    };
    run().map_err(|e| e.in_sheet(&sheet.name).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::aliases::AliasTarget;
    use crate::ingest::error::IngestError;
    use crate::ingest::registry::CanonicalRegistry;
    use crate::ingest::workbook::{sheet_from_rows, Cell};

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn context() -> IngestContext {
        let mut ctx = IngestContext::new(CanonicalRegistry::build([
            "Protein", "Fat", "Fiber", "Sodium",
        ]));
        for (alias, name_id) in [("Prot A", 3u32), ("Prot B", 3), ("Fat Total", 1)] {
            ctx.aliases
                .insert_checked(
                    2,
                    alias.to_string(),
                    AliasTarget {
                        name_id,
                        ratio: 1.0,
                    },
                )
                .unwrap();
        }
        ctx
    }

    fn headers() -> Vec<&'static str> {
        vec!["FormulaID", "FormulaName", "Prot A", "Prot B", "Fat Total"]
    }

    #[test]
    fn test_columns_summed_with_multipliers() {
        let mut ctx = context();
        ctx.column_multipliers.insert("Prot B".to_string(), 2.0);

        let sheet = sheet_from_rows(
            SHEET_AGILE,
            &headers(),
            vec![vec![
                text("F100"),
                text("Granola"),
                Cell::Number(5.0),
                Cell::Number(1.5),
                Cell::Empty,
            ]],
        );
        let foods = build_agile_foods(&sheet, &ctx).unwrap();
        assert_eq!(foods.len(), 1);
        // 5 + 1.5 * 2 = 8 into slot 3; every other slot collapses to empty
        assert_eq!(foods[0].nutrients.data.as_str(), ",,,8.0");
        assert_eq!(foods[0].source, FoodSource::Agile);
        assert_eq!(foods[0].qty_per_serving, None);
    }

    #[test]
    fn test_encoded_vector_spans_registry() {
        let ctx = context();
        let sheet = sheet_from_rows(
            SHEET_AGILE,
            &headers(),
            vec![vec![
                text("F100"),
                text("Granola"),
                Cell::Number(10.0),
                Cell::Empty,
                Cell::Number(0.0),
            ]],
        );
        let foods = build_agile_foods(&sheet, &ctx).unwrap();
        let decoded = foods[0].nutrients.data.decode().unwrap();
        assert_eq!(decoded, vec![0.0, 0.0, 0.0, 10.0]);
    }

    #[test]
    fn test_duplicate_food_ids_always_fail() {
        let ctx = context();
        let sheet = sheet_from_rows(
            SHEET_AGILE,
            &headers(),
            vec![
                vec![
                    text("F100"),
                    text("Granola"),
                    Cell::Number(1.0),
                    Cell::Empty,
                    Cell::Empty,
                ],
                vec![
                    text("F100"),
                    text("Granola"),
                    Cell::Number(1.0),
                    Cell::Empty,
                    Cell::Empty,
                ],
            ],
        );
        let err = build_agile_foods(&sheet, &ctx).unwrap_err();
        match err {
            IngestError::Validation(v) => {
                assert_eq!(v.sheet.as_deref(), Some(SHEET_AGILE));
                assert!(v.message.contains("duplicated"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_unaliased_column_fails() {
        let ctx = context();
        let sheet = sheet_from_rows(
            SHEET_AGILE,
            &["FormulaID", "FormulaName", "Mystery"],
            vec![vec![text("F100"), text("Granola"), Cell::Number(1.0)]],
        );
        let err = build_agile_foods(&sheet, &ctx).unwrap_err();
        assert!(err
            .to_string()
            .contains("row#1 nutrient name `Mystery` not aliased"));
    }

    #[test]
    fn test_malformed_cell_fails_with_row() {
        let ctx = context();
        let sheet = sheet_from_rows(
            SHEET_AGILE,
            &headers(),
            vec![vec![
                text("F100"),
                text("Granola"),
                text("lots"),
                Cell::Empty,
                Cell::Empty,
            ]],
        );
        let err = build_agile_foods(&sheet, &ctx).unwrap_err();
        match err {
            IngestError::Validation(v) => assert_eq!(v.row, Some(2)),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }
}
