//! Pipeline orchestration
//!
//! Sequences the whole build: the two workbook loads and storage
//! initialization run concurrently as blocking tasks; every resolution
//! stage after that is strictly sequential, because each consumes the
//! previous stage's validated output. Any task error re-raises at its
//! join point and aborts the rest of the run; nothing is ever partially
//! committed.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::task::{self, JoinHandle};
use tracing::info;

use crate::db::{migrations, Database};

use super::agile::{self, SHEET_AGILE};
use super::context::IngestContext;
use super::dat::{
    self, SHEET_ALIASES, SHEET_CANONICAL_NAMES, SHEET_LIMITS, SHEET_MULTIPLIERS, SHEET_USDA_FOODS,
    SHEET_USDA_NUTRIENTS,
};
use super::error::{IngestError, IngestResult};
use super::persist::{PersistSummary, PersistenceCoordinator, RecordBatch};
use super::remote;
use super::workbook::load_workbook;

/// Everything a build run needs to know
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The data workbook (registry, USDA tables, aliases, limits)
    pub dat_path: PathBuf,
    /// The agile formulation workbook
    pub agile_path: PathBuf,
    /// Where the built database goes; replaced if it exists
    pub database_path: PathBuf,
    /// USDA FoodData Central search endpoint; lookup disabled when unset
    pub usda_lookup_url: Option<String>,
}

/// The build pipeline
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the whole build: load, resolve, persist.
    pub async fn run(&self) -> IngestResult<PersistSummary> {
        let started = Instant::now();
        info!("building nutrient database...");

        let dat_path = self.config.dat_path.clone();
        let dat_task = task::spawn_blocking(move || load_workbook(&dat_path, &dat::dat_sheet_specs()));

        let agile_path = self.config.agile_path.clone();
        let agile_task =
            task::spawn_blocking(move || load_workbook(&agile_path, &agile::agile_sheet_specs()));

        let database_path = self.config.database_path.clone();
        let database_task = task::spawn_blocking(move || init_database(&database_path));

        // The data workbook gates everything: the registry it defines
        // fixes vector order for the run
        let dat_workbook = join(dat_task).await?;
        let mut batches = Vec::new();

        let (registry, nutrient_records) =
            dat::build_registry(dat_workbook.sheet(SHEET_CANONICAL_NAMES)?)?;
        batches.push(RecordBatch::Nutrients(nutrient_records));

        let mut ctx = IngestContext::new(registry);
        dat::resolve_usda_foods(dat_workbook.sheet(SHEET_USDA_FOODS)?, &mut ctx)?;
        dat::resolve_usda_nutrients(dat_workbook.sheet(SHEET_USDA_NUTRIENTS)?, &mut ctx)?;

        // The lookup needs only the USDA tables, so it can overlap the
        // remaining resolution stages
        let usda_task: Option<JoinHandle<IngestResult<_>>> =
            self.config.usda_lookup_url.clone().map(|url| {
                let usda = ctx.usda.clone();
                let ids = ctx.registry.ids();
                task::spawn_blocking(move || remote::fetch_usda_foods(&url, &usda, &ids))
            });

        dat::resolve_aliases(dat_workbook.sheet(SHEET_ALIASES)?, &mut ctx)?;
        let region_records = dat::resolve_limits(dat_workbook.sheet(SHEET_LIMITS)?, &ctx)?;
        dat::resolve_column_multipliers(dat_workbook.sheet(SHEET_MULTIPLIERS)?, &mut ctx)?;

        let agile_workbook = join(agile_task).await?;
        let agile_foods = agile::build_agile_foods(agile_workbook.sheet(SHEET_AGILE)?, &ctx)?;

        if let Some(lookup) = usda_task {
            let usda_foods = join(lookup).await?;
            batches.push(RecordBatch::Foods(usda_foods));
        }
        batches.push(RecordBatch::Foods(agile_foods));
        batches.push(RecordBatch::Regions(region_records));

        let database = join(database_task).await?;
        let summary = PersistenceCoordinator::new(database).persist(batches)?;

        info!(
            "built nutrient database ({:.2}s)",
            started.elapsed().as_secs_f64()
        );
        Ok(summary)
    }
}

/// Re-raise a blocking task's failure at the join point
async fn join<T>(task: JoinHandle<IngestResult<T>>) -> IngestResult<T> {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(IngestError::Internal(e.to_string())),
    }
}

/// Initialize a fresh database: the build replaces any previous one.
fn init_database(path: &Path) -> IngestResult<Database> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| IngestError::Internal(format!("create `{}`: {}", parent.display(), e)))?;
        }
    }

    if path.exists() {
        info!("replacing existing database at {}", path.display());
        std::fs::remove_file(path)
            .map_err(|e| IngestError::Internal(format!("remove `{}`: {}", path.display(), e)))?;
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(sidecar));
        }
    }

    let database = Database::new(path)?;
    database.with_conn(migrations::run_migrations)?;
    info!("initialized database at {}", path.display());
    Ok(database)
}
