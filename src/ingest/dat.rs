//! Data workbook resolution
//!
//! The first workbook carries the canonical registry and every lookup
//! table the food vectors depend on. Its sheets resolve strictly in
//! dependency order: registry first, then the USDA tables, then
//! aliases, then the sheets whose labels must already be aliased.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::models::{NutrientRecord, RegionRecord};
use crate::vector::{encode_cells, round_value, NutrientCell};

use super::aliases::AliasTarget;
use super::checks::check_and_insert;
use super::context::{IngestContext, UsdaNutrient};
use super::error::{IngestResult, ValidationError};
use super::registry::CanonicalRegistry;
use super::workbook::{Cell, Sheet, SheetSpec};

pub const SHEET_CANONICAL_NAMES: &str = "CanonicalNames";
pub const SHEET_USDA_FOODS: &str = "USDAFoods";
pub const SHEET_USDA_NUTRIENTS: &str = "USDANutrients";
pub const SHEET_ALIASES: &str = "NutrientAliases";
pub const SHEET_LIMITS: &str = "Limits";
pub const SHEET_MULTIPLIERS: &str = "AgileColumnMultipliers";

/// The sheets and columns required from the data workbook
pub fn dat_sheet_specs() -> Vec<SheetSpec> {
    vec![
        SheetSpec::with_columns(SHEET_CANONICAL_NAMES, &["CanonicalName"]),
        SheetSpec::with_columns(SHEET_USDA_FOODS, &["FoodID", "QTY (g)"]),
        SheetSpec::with_columns(
            SHEET_USDA_NUTRIENTS,
            &["CanonicalName", "NutrientID", "Multiplier"],
        ),
        SheetSpec::with_columns(SHEET_ALIASES, &["Alias", "CanonicalName", "Ratio"]),
        SheetSpec::with_columns(
            SHEET_LIMITS,
            &[
                "RegionName",
                "Source",
                "Nutrient",
                "Daily Intake",
                "GuidanceLevel",
            ],
        ),
        SheetSpec::with_columns(SHEET_MULTIPLIERS, &["ColumnName", "Multiplier"]),
    ]
}

fn in_sheet<T>(sheet: &Sheet, result: Result<T, ValidationError>) -> IngestResult<T> {
    result.map_err(|e| e.in_sheet(&sheet.name).into())
}

/// Build the canonical registry from the canonical-names sheet, staging
/// one nutrient record per dense id.
pub fn build_registry(sheet: &Sheet) -> IngestResult<(CanonicalRegistry, Vec<NutrientRecord>)> {
    let column = in_sheet(sheet, sheet.column_index("CanonicalName"))?;

    let names = sheet
        .rows()
        .map(|(_, cells)| sheet.cell(cells, column).display())
        .filter(|name| !name.is_empty());
    let registry = CanonicalRegistry::build(names);

    let records = registry
        .names()
        .iter()
        .enumerate()
        .map(|(id, name)| NutrientRecord::new(id as u32, name.as_str()))
        .collect();

    info!("built canonical registry ({} nutrients)", registry.len());
    Ok((registry, records))
}

/// Resolve USDA food quantities: food id -> grams per serving
pub fn resolve_usda_foods(sheet: &Sheet, ctx: &mut IngestContext) -> IngestResult<()> {
    let run = |ctx: &mut IngestContext| -> Result<(), ValidationError> {
        let id_col = sheet.column_index("FoodID")?;
        let qty_col = sheet.column_index("QTY (g)")?;

        for (row, cells) in sheet.rows() {
            let id_cell = sheet.cell(cells, id_col);
            let food_id = id_cell.as_i64().ok_or_else(|| {
                ValidationError::at_row(
                    row,
                    format!("FoodID `{}` is not an integer", id_cell.display()),
                )
            })?;

            let qty_cell = sheet.cell(cells, qty_col);
            let qty = qty_cell.as_f64().ok_or_else(|| {
                ValidationError::at_row(row, format!("QTY (g) for `{}` is not a number", food_id))
            })?;

            check_and_insert(
                &mut ctx.usda.foods,
                row,
                food_id,
                round_value(qty),
                &format!("qty for `{}`", food_id),
            )?;
        }

        debug!("resolved {} USDA food quantities", ctx.usda.foods.len());
        Ok(())
    };
    in_sheet(sheet, run(ctx))
}

/// Resolve USDA nutrient mappings: external id -> (canonical slot, multiplier).
///
/// Rows are sorted by NutrientID before insertion so duplicate
/// diagnostics are deterministic.
pub fn resolve_usda_nutrients(sheet: &Sheet, ctx: &mut IngestContext) -> IngestResult<()> {
    let run = |ctx: &mut IngestContext| -> Result<(), ValidationError> {
        let canonical_col = sheet.column_index("CanonicalName")?;
        let id_col = sheet.column_index("NutrientID")?;
        let multiplier_col = sheet.column_index("Multiplier")?;

        let mut rows: Vec<(u32, &Cell, i64, f64)> = Vec::with_capacity(sheet.row_count());
        for (row, cells) in sheet.rows() {
            let id_cell = sheet.cell(cells, id_col);
            let nutrient_id = id_cell.as_i64().ok_or_else(|| {
                ValidationError::at_row(
                    row,
                    format!("NutrientID `{}` is not an integer", id_cell.display()),
                )
            })?;

            let multiplier_cell = sheet.cell(cells, multiplier_col);
            let multiplier = multiplier_cell.as_f64().ok_or_else(|| {
                ValidationError::at_row(
                    row,
                    format!("Multiplier for `{}` is not a number", nutrient_id),
                )
            })?;

            rows.push((row, sheet.cell(cells, canonical_col), nutrient_id, multiplier));
        }
        rows.sort_by_key(|&(_, _, nutrient_id, _)| nutrient_id);

        for (row, canonical, nutrient_id, multiplier) in rows {
            let name_id = ctx.registry.check_is_canonical(row, canonical)?;
            check_and_insert(
                &mut ctx.usda.nutrients,
                row,
                nutrient_id,
                UsdaNutrient {
                    name_id,
                    multiplier: round_value(multiplier),
                },
                &format!("canonical name `{}`", canonical.display()),
            )?;
        }

        debug!("resolved {} USDA nutrient mappings", ctx.usda.nutrients.len());
        Ok(())
    };
    in_sheet(sheet, run(ctx))
}

/// Resolve nutrient aliases: label -> (canonical slot, ratio)
pub fn resolve_aliases(sheet: &Sheet, ctx: &mut IngestContext) -> IngestResult<()> {
    let run = |ctx: &mut IngestContext| -> Result<(), ValidationError> {
        let alias_col = sheet.column_index("Alias")?;
        let canonical_col = sheet.column_index("CanonicalName")?;
        let ratio_col = sheet.column_index("Ratio")?;

        for (row, cells) in sheet.rows() {
            let alias = sheet.cell(cells, alias_col).display();
            if alias.is_empty() {
                return Err(ValidationError::at_row(row, "Alias is empty"));
            }

            let name_id = ctx
                .registry
                .check_is_canonical(row, sheet.cell(cells, canonical_col))?;

            let ratio_cell = sheet.cell(cells, ratio_col);
            let ratio = if ratio_cell.is_empty() {
                1.0
            } else {
                ratio_cell.as_f64().ok_or_else(|| {
                    ValidationError::at_row(
                        row,
                        format!("Ratio for `{}` is not a number", alias),
                    )
                })?
            };

            ctx.aliases
                .insert_checked(row, alias, AliasTarget { name_id, ratio })?;
        }

        debug!("resolved {} nutrient aliases", ctx.aliases.len());
        Ok(())
    };
    in_sheet(sheet, run(ctx))
}

/// Resolve region guidance limits, building one limit vector per region.
///
/// A textual Daily Intake cell must read `ND` (any case) and marks the
/// limit as not determined; otherwise the GuidanceLevel cell supplies
/// the numeric limit.
pub fn resolve_limits(sheet: &Sheet, ctx: &IngestContext) -> IngestResult<Vec<RegionRecord>> {
    let run = || -> Result<Vec<RegionRecord>, ValidationError> {
        let region_col = sheet.column_index("RegionName")?;
        let source_col = sheet.column_index("Source")?;
        let nutrient_col = sheet.column_index("Nutrient")?;
        let intake_col = sheet.column_index("Daily Intake")?;
        let level_col = sheet.column_index("GuidanceLevel")?;

        // First-seen order fixes both the citation string and the
        // eventual persistence order
        let mut order: Vec<String> = Vec::new();
        let mut sources: HashMap<String, String> = HashMap::new();
        let mut limits: HashMap<String, HashMap<u32, NutrientCell>> = HashMap::new();

        for (row, cells) in sheet.rows() {
            let region = sheet.cell(cells, region_col).display();
            if region.is_empty() {
                return Err(ValidationError::at_row(row, "RegionName is empty"));
            }
            if !sources.contains_key(&region) {
                sources.insert(region.clone(), sheet.cell(cells, source_col).display());
                order.push(region.clone());
            }

            let label = sheet.cell(cells, nutrient_col).display();
            let target = ctx.aliases.check_is_aliased(row, &label)?;

            let value = match sheet.cell(cells, intake_col) {
                Cell::Text(s) if s.eq_ignore_ascii_case("ND") => NutrientCell::NotDetermined,
                Cell::Text(_) => {
                    return Err(ValidationError::at_row(
                        row,
                        "non-numeric Daily Intake must be ND (case insensitive)",
                    ));
                }
                _ => {
                    let level_cell = sheet.cell(cells, level_col);
                    let level = level_cell.as_f64().ok_or_else(|| {
                        ValidationError::at_row(
                            row,
                            format!("GuidanceLevel for `{}` is not a number", label),
                        )
                    })?;
                    NutrientCell::Numeric(round_value(level))
                }
            };

            let nutrient_name = ctx.registry.name(target.name_id).unwrap_or(label.as_str());
            let what = format!("{} limit for `{}`", region, nutrient_name);
            check_and_insert(
                limits.entry(region.clone()).or_default(),
                row,
                target.name_id,
                value,
                &what,
            )?;
        }

        let ids = ctx.registry.ids();
        let records = order
            .into_iter()
            .map(|region| {
                let cells = limits.remove(&region).unwrap_or_default();
                let source = sources.remove(&region).unwrap_or_default();
                RegionRecord::new(region, source, encode_cells(&cells, &ids))
            })
            .collect::<Vec<_>>();

        info!("resolved guidance limits for {} regions", records.len());
        Ok(records)
    };
    in_sheet(sheet, run())
}

/// Resolve agile column multipliers: column name -> multiplier
pub fn resolve_column_multipliers(sheet: &Sheet, ctx: &mut IngestContext) -> IngestResult<()> {
    let run = |ctx: &mut IngestContext| -> Result<(), ValidationError> {
        let name_col = sheet.column_index("ColumnName")?;
        let multiplier_col = sheet.column_index("Multiplier")?;

        for (row, cells) in sheet.rows() {
            let name = sheet.cell(cells, name_col).display();
            ctx.aliases.check_is_aliased(row, &name)?;

            let multiplier_cell = sheet.cell(cells, multiplier_col);
            let multiplier = multiplier_cell.as_f64().ok_or_else(|| {
                ValidationError::at_row(row, format!("Multiplier for `{}` is not a number", name))
            })?;

            check_and_insert(
                &mut ctx.column_multipliers,
                row,
                name.clone(),
                round_value(multiplier),
                &format!("column name `{}`", name),
            )?;
        }

        debug!(
            "resolved {} agile column multipliers",
            ctx.column_multipliers.len()
        );
        Ok(())
    };
    in_sheet(sheet, run(ctx))
}
