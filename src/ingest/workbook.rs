//! Workbook loading
//!
//! Turns raw .xlsx bytes into named, row-oriented tables, narrowed to
//! the columns the caller declared relevant. The two source workbooks
//! have no cross-file dependency and may load concurrently.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use tracing::debug;

use super::error::{IngestError, IngestResult, ValidationError};

/// One sheet to read from a workbook, with an optional column subset
#[derive(Debug, Clone)]
pub struct SheetSpec {
    pub name: String,
    /// Columns to keep; `None` keeps every column
    pub columns: Option<Vec<String>>,
}

impl SheetSpec {
    /// Keep every column of the sheet
    pub fn all_columns(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: None,
        }
    }

    /// Keep only the named columns, in the given order
    pub fn with_columns(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: Some(columns.iter().map(|c| c.to_string()).collect()),
        }
    }
}

/// A single spreadsheet cell, typed
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(trimmed.to_string())
                }
            }
            Data::Float(v) => Cell::Number(*v),
            Data::Int(v) => Cell::Number(*v as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::Empty => Cell::Empty,
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// The cell as a float; numeric text parses too
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The cell as an integer, if it is integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Number(v) if v.fract() == 0.0 => Some(*v as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Human-readable form, used in identifiers and error messages
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(v) => v.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// A loaded, column-narrowed sheet
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    headers: Vec<String>,
    /// Data rows with their 1-based spreadsheet row numbers
    rows: Vec<(u32, Vec<Cell>)>,
}

impl Sheet {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Iterate data rows as (spreadsheet row number, cells).
    /// The header row is row 1, so data rows start at 2.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &[Cell])> + '_ {
        self.rows.iter().map(|(n, cells)| (*n, cells.as_slice()))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a header, as a sheet-tagged validation failure if absent
    pub fn column_index(&self, name: &str) -> Result<usize, ValidationError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                ValidationError::new(format!("missing column `{}`", name)).in_sheet(&self.name)
            })
    }

    /// Cell at a column index within a row slice; missing trailing cells
    /// read as empty
    pub fn cell<'a>(&self, cells: &'a [Cell], index: usize) -> &'a Cell {
        cells.get(index).unwrap_or(&Cell::Empty)
    }
}

/// A set of loaded sheets from one workbook
#[derive(Debug, Clone)]
pub struct Workbook {
    pub file: String,
    sheets: HashMap<String, Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> IngestResult<&Sheet> {
        self.sheets.get(name).ok_or_else(|| {
            IngestError::load(&self.file, format!("sheet `{}` was not loaded", name))
        })
    }
}

/// Load the requested sheets from an .xlsx workbook.
///
/// A malformed file or missing sheet fails with a load error carrying
/// the file name; a requested column absent from a header row fails
/// with a sheet-tagged validation error.
pub fn load_workbook(path: &Path, specs: &[SheetSpec]) -> IngestResult<Workbook> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    if !path.exists() {
        return Err(IngestError::load(&file, "file not found"));
    }

    debug!("loading `{}`...", file);

    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e: calamine::XlsxError| IngestError::load(&file, e.to_string()))?;

    let mut sheets = HashMap::new();
    for spec in specs {
        let range = workbook
            .worksheet_range(&spec.name)
            .map_err(|e| IngestError::load(&file, format!("sheet `{}`: {}", spec.name, e)))?;
        let sheet = build_sheet(spec, &range)?;
        debug!("loaded sheet `{}` ({} rows)", sheet.name, sheet.row_count());
        sheets.insert(spec.name.clone(), sheet);
    }

    Ok(Workbook { file, sheets })
}

fn build_sheet(spec: &SheetSpec, range: &calamine::Range<Data>) -> IngestResult<Sheet> {
    let mut raw_rows = range.rows();

    let headers: Vec<String> = raw_rows
        .next()
        .map(|row| {
            row.iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    // Column narrowing: keep only the requested subset, in request order
    let projection: Option<Vec<usize>> = match &spec.columns {
        Some(wanted) => {
            let mut indices = Vec::with_capacity(wanted.len());
            for column in wanted {
                let index = headers.iter().position(|h| h == column).ok_or_else(|| {
                    ValidationError::new(format!("missing column `{}`", column))
                        .in_sheet(&spec.name)
                })?;
                indices.push(index);
            }
            Some(indices)
        }
        None => None,
    };

    let kept_headers = match (&projection, &spec.columns) {
        (Some(_), Some(wanted)) => wanted.clone(),
        _ => headers,
    };

    let mut rows = Vec::new();
    for (offset, raw_row) in raw_rows.enumerate() {
        // Header row is 1, so the first data row is 2
        let row_num = offset as u32 + 2;

        let cells: Vec<Cell> = match &projection {
            Some(indices) => indices
                .iter()
                .map(|&i| raw_row.get(i).map(Cell::from_data).unwrap_or(Cell::Empty))
                .collect(),
            None => raw_row.iter().map(Cell::from_data).collect(),
        };

        // Skip fully blank rows; numbering still counts them
        if cells.iter().all(Cell::is_empty) {
            continue;
        }

        rows.push((row_num, cells));
    }

    Ok(Sheet {
        name: spec.name.clone(),
        headers: kept_headers,
        rows,
    })
}

/// Build a sheet directly from cells, for stage tests
#[cfg(test)]
pub(crate) fn sheet_from_rows(name: &str, headers: &[&str], rows: Vec<Vec<Cell>>) -> Sheet {
    Sheet {
        name: name.to_string(),
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .into_iter()
            .enumerate()
            .map(|(i, cells)| (i as u32 + 2, cells))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook as XlsxWorkbook;
    use tempfile::tempdir;

    fn write_fixture(path: &Path) {
        let mut wb = XlsxWorkbook::new();
        let ws = wb.add_worksheet().set_name("Foods").unwrap();
        ws.write_string(0, 0, "FoodID").unwrap();
        ws.write_string(0, 1, "QTY (g)").unwrap();
        ws.write_string(0, 2, "Extra").unwrap();
        ws.write_string(1, 0, "F100").unwrap();
        ws.write_number(1, 1, 2.5).unwrap();
        ws.write_string(1, 2, "ignored").unwrap();
        // Blank spreadsheet row, then one more data row
        ws.write_string(3, 0, "F200").unwrap();
        ws.write_number(3, 1, 3.0).unwrap();
        wb.save(path).unwrap();
    }

    #[test]
    fn test_load_narrows_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foods.xlsx");
        write_fixture(&path);

        let specs = [SheetSpec::with_columns("Foods", &["FoodID", "QTY (g)"])];
        let workbook = load_workbook(&path, &specs).unwrap();
        let sheet = workbook.sheet("Foods").unwrap();

        assert_eq!(sheet.headers(), &["FoodID", "QTY (g)"]);
        let rows: Vec<_> = sheet.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 2);
        assert_eq!(rows[0].1[0], Cell::Text("F100".to_string()));
        assert_eq!(rows[0].1[1], Cell::Number(2.5));
    }

    #[test]
    fn test_blank_rows_preserve_numbering() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foods.xlsx");
        write_fixture(&path);

        let specs = [SheetSpec::with_columns("Foods", &["FoodID", "QTY (g)"])];
        let workbook = load_workbook(&path, &specs).unwrap();
        let sheet = workbook.sheet("Foods").unwrap();

        let rows: Vec<_> = sheet.rows().collect();
        // The blank row 3 is skipped but row 4 keeps its number
        assert_eq!(rows[1].0, 4);
    }

    #[test]
    fn test_missing_file() {
        let err = load_workbook(Path::new("no_such.xlsx"), &[]).unwrap_err();
        assert!(matches!(err, IngestError::Load { .. }));
    }

    #[test]
    fn test_missing_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foods.xlsx");
        write_fixture(&path);

        let specs = [SheetSpec::all_columns("Missing")];
        let err = load_workbook(&path, &specs).unwrap_err();
        match err {
            IngestError::Load { file, message } => {
                assert_eq!(file, "foods.xlsx");
                assert!(message.contains("Missing"));
            }
            other => panic!("expected load failure, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foods.xlsx");
        write_fixture(&path);

        let specs = [SheetSpec::with_columns("Foods", &["FoodID", "Nope"])];
        let err = load_workbook(&path, &specs).unwrap_err();
        match err {
            IngestError::Validation(v) => {
                assert_eq!(v.sheet.as_deref(), Some("Foods"));
                assert!(v.message.contains("`Nope`"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_cell_conversions() {
        assert_eq!(Cell::Number(3.0).as_i64(), Some(3));
        assert_eq!(Cell::Number(3.5).as_i64(), None);
        assert_eq!(Cell::Text("42".to_string()).as_i64(), Some(42));
        assert_eq!(Cell::Text("4.5".to_string()).as_f64(), Some(4.5));
        assert_eq!(Cell::Number(3.0).display(), "3");
        assert!(Cell::Empty.as_f64().is_none());
    }
}
