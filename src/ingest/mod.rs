//! Ingestion pipeline
//!
//! Loads the source workbooks, resolves them into validated records,
//! and persists everything in one transaction.

pub mod agile;
pub mod aliases;
pub mod checks;
pub mod context;
pub mod dat;
pub mod error;
pub mod persist;
pub mod pipeline;
pub mod registry;
pub mod remote;
pub mod workbook;

pub use aliases::{AliasMap, AliasTarget};
pub use context::{IngestContext, UsdaNutrient, UsdaTables};
pub use error::{IngestError, IngestResult, ValidationError};
pub use persist::{PersistSummary, PersistenceCoordinator, RecordBatch};
pub use pipeline::{Pipeline, PipelineConfig};
pub use registry::CanonicalRegistry;
pub use workbook::{load_workbook, Cell, Sheet, SheetSpec, Workbook};
