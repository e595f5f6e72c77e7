//! Workbook data structures

use std::fmt;
use std::path::PathBuf;

/// First row holding data in every dashboard sheet (row 0 title, row 1 blank, row 2 headers)
pub const DATA_START_ROW: usize = 3;

/// Represents a complete workbook
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Get a sheet by name (exact, case-sensitive)
    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Get all sheet names
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// A worksheet as a rectangular grid anchored at A1
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

static EMPTY: CellValue = CellValue::Empty;

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Build a sheet from rows, padding short rows so the grid stays rectangular
    pub fn from_rows(name: impl Into<String>, mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, CellValue::Empty);
        }
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Get the cell at the given position; out-of-range positions read as empty
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Number of columns in the grid
    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Rows from `start` onward, with their absolute index
    pub fn rows_from(&self, start: usize) -> impl Iterator<Item = (usize, &[CellValue])> {
        self.rows
            .iter()
            .enumerate()
            .skip(start)
            .map(|(idx, row)| (idx, row.as_slice()))
    }

    /// Data rows of the fixed dashboard layout
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[CellValue])> {
        self.rows_from(DATA_START_ROW)
    }
}

/// Cell value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(String),
}

impl CellValue {
    /// Shorthand for text cells
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Empty cell or text that is empty after trimming
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Falsy values never start a record: empty, "", 0, false and error cells
    pub fn is_falsy(&self) -> bool {
        match self {
            CellValue::Empty | CellValue::Error(_) => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Boolean(b) => !b,
        }
    }

    /// Check if the cell contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the cell the way a label is read: numbers without a trailing `.0`
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Error(e) => f.write_str(e),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::from(s.as_str())
    }
}
