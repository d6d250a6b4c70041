//! Ingestion error types
//!
//! Three failure kinds cross the pipeline boundary: a source file that
//! cannot be loaded, a validation failure (tagged with sheet and
//! 1-based spreadsheet row where known), and a rejected transactional
//! write. Sheet validation fails fast on the first problem; only the
//! remote-lookup path accumulates before failing.

use std::fmt;

use thiserror::Error;

use crate::db::DbError;

/// Ingestion error taxonomy
#[derive(Debug, Error)]
pub enum IngestError {
    /// A source file or remote resource could not be loaded
    #[error("failed to load `{file}`: {message}")]
    Load { file: String, message: String },

    /// A referential miss, conflicting duplicate, or malformed cell
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The transactional write was rejected by the store
    #[error("persistence failed: {0}")]
    Persistence(#[from] DbError),

    /// A pipeline task died without reporting a typed error
    #[error("internal error: {0}")]
    Internal(String),
}

impl IngestError {
    pub fn load(file: impl Into<String>, message: impl Into<String>) -> Self {
        IngestError::Load {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

/// A validation failure, optionally tagged with its sheet and row.
///
/// Row numbers use spreadsheet numbering: the header row is 1, the
/// first data row is 2.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub sheet: Option<String>,
    pub row: Option<u32>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sheet: None,
            row: None,
            message: message.into(),
        }
    }

    pub fn at_row(row: u32, message: impl Into<String>) -> Self {
        Self {
            sheet: None,
            row: Some(row),
            message: message.into(),
        }
    }

    /// Tag the error with its sheet; an already-set sheet wins
    pub fn in_sheet(mut self, sheet: &str) -> Self {
        self.sheet.get_or_insert_with(|| sheet.to_string());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{} ", sheet)?;
        }
        if let Some(row) = self.row {
            write!(f, "row#{} ", row)?;
        }
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_fully_tagged() {
        let err = ValidationError::at_row(5, "alias `Protein` duplicated with different value")
            .in_sheet("NutrientAliases");
        assert_eq!(
            err.to_string(),
            "NutrientAliases row#5 alias `Protein` duplicated with different value"
        );
    }

    #[test]
    fn test_display_untagged() {
        let err = ValidationError::new("one or more food ids are duplicated");
        assert_eq!(err.to_string(), "one or more food ids are duplicated");
    }

    #[test]
    fn test_sheet_tag_does_not_overwrite() {
        let err = ValidationError::new("x").in_sheet("First").in_sheet("Second");
        assert_eq!(err.sheet.as_deref(), Some("First"));
    }
}
