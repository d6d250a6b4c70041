//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    // Get current version
    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    // Run migrations
    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- NUTRIENTS
        -- Canonical nutrient registry; name_id is the dense
        -- canonical id that fixes vector slot positions
        -- ============================================
        CREATE TABLE nutrients (
            id INTEGER PRIMARY KEY,
            name_id INTEGER NOT NULL,            -- dense canonical id, 0..N-1
            name TEXT NOT NULL,                  -- canonical nutrient name
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_nutrients_name_id ON nutrients(name_id);

        -- ============================================
        -- FOODS
        -- One row per ingested food across both sources
        -- ============================================
        CREATE TABLE foods (
            id INTEGER PRIMARY KEY,
            food_id TEXT NOT NULL,               -- external identifier (FDC id or formula id)
            description TEXT NOT NULL,
            source TEXT NOT NULL CHECK(source IN ('usda', 'agile')),
            qty_per_serving REAL,                -- grams; NULL for agile foods
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_foods_food_id ON foods(food_id);

        -- ============================================
        -- REGIONS
        -- One row per geographic/regulatory region
        -- ============================================
        CREATE TABLE regions (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            source TEXT NOT NULL,                -- citation for the limits data
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- NUTRIENT DATA
        -- Encoded per-nutrient vector, 1:1 child of a food
        -- (amounts) or a region (guidance limits)
        -- ============================================
        CREATE TABLE nutrient_data (
            id INTEGER PRIMARY KEY,
            data TEXT NOT NULL,                  -- comma-joined cells in canonical id order
            food_id INTEGER REFERENCES foods(id),
            region_id INTEGER REFERENCES regions(id)
        );

        CREATE INDEX idx_nutrient_data_food ON nutrient_data(food_id);
        CREATE INDEX idx_nutrient_data_region ON nutrient_data(region_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
