//! Persistence coordination
//!
//! Assigns primary keys across the accumulated record batches and
//! performs the single atomic bulk write. Key counters are per type
//! and carry across batches, so a later food batch continues numbering
//! where the earlier one stopped. For each parent with a vector child,
//! both keys and the child's foreign key are stamped before either row
//! is written.

use tracing::{debug, info};

use crate::db::Database;
use crate::models::{FoodRecord, NutrientData, NutrientRecord, RegionRecord};

use super::error::IngestResult;

/// Row counts from one persisted run
#[derive(Debug, Default, Clone, Copy)]
pub struct PersistSummary {
    pub nutrients: usize,
    pub foods: usize,
    pub regions: usize,
}

/// One homogeneous batch of staged records
#[derive(Debug)]
pub enum RecordBatch {
    Nutrients(Vec<NutrientRecord>),
    Foods(Vec<FoodRecord>),
    Regions(Vec<RegionRecord>),
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        match self {
            RecordBatch::Nutrients(records) => records.len(),
            RecordBatch::Foods(records) => records.len(),
            RecordBatch::Regions(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            RecordBatch::Nutrients(_) => "nutrient",
            RecordBatch::Foods(_) => "food",
            RecordBatch::Regions(_) => "region",
        }
    }
}

/// Last-assigned primary key per record type; vector children share one
/// counter across foods and regions
#[derive(Debug, Default, Clone, Copy)]
struct KeyCounters {
    nutrients: i64,
    foods: i64,
    regions: i64,
    vectors: i64,
}

/// Writes all staged batches inside one transaction
pub struct PersistenceCoordinator {
    database: Database,
}

impl PersistenceCoordinator {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Persist every batch, all-or-nothing.
    ///
    /// Vector children are written before their parents within each
    /// batch; foreign key checks are deferred to commit so that order
    /// is legal under `PRAGMA foreign_keys = ON`.
    pub fn persist(&self, mut batches: Vec<RecordBatch>) -> IngestResult<PersistSummary> {
        let summary = self.database.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

            let mut counters = KeyCounters::default();
            let mut summary = PersistSummary::default();

            for batch in &mut batches {
                match batch {
                    RecordBatch::Nutrients(records) => {
                        for record in records.iter_mut() {
                            counters.nutrients += 1;
                            record.id = Some(counters.nutrients);
                        }
                        summary.nutrients += NutrientRecord::insert_batch(&tx, records)?;
                    }
                    RecordBatch::Foods(records) => {
                        for record in records.iter_mut() {
                            counters.foods += 1;
                            counters.vectors += 1;
                            record.set_keys(counters.foods, counters.vectors);
                        }
                        NutrientData::insert_batch(&tx, records.iter().map(|r| &r.nutrients))?;
                        summary.foods += FoodRecord::insert_batch(&tx, records)?;
                    }
                    RecordBatch::Regions(records) => {
                        for record in records.iter_mut() {
                            counters.regions += 1;
                            counters.vectors += 1;
                            record.set_keys(counters.regions, counters.vectors);
                        }
                        NutrientData::insert_batch(&tx, records.iter().map(|r| &r.limits))?;
                        summary.regions += RegionRecord::insert_batch(&tx, records)?;
                    }
                }
                debug!("wrote {} {} records", batch.len(), batch.kind());
            }

            tx.commit()?;
            Ok(summary)
        })?;

        info!(
            "persisted {} nutrients, {} foods, {} regions",
            summary.nutrients, summary.foods, summary.regions
        );
        Ok(summary)
    }
}
