//! Excel/ODS file reader using calamine

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::Path;

pub mod workbook;

pub use workbook::{CellValue, DATA_START_ROW, Sheet, Workbook};

use crate::error::{IngestError, IngestResult};

const SUPPORTED_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Read a workbook from a file path
///
/// The file is read into memory first so that no handle stays open while the
/// sheets are decoded; a spreadsheet editor can keep saving the file meanwhile.
pub fn read_workbook<P: AsRef<Path>>(path: P) -> IngestResult<Workbook> {
    let path = path.as_ref();

    let supported = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false);
    if !supported {
        return Err(IngestError::UnsupportedFormat(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            IngestError::NotFound(path.to_path_buf())
        } else {
            IngestError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    read_workbook_from_bytes(bytes, path)
}

/// Decode a workbook already held in memory; `path` is recorded for reporting only
pub fn read_workbook_from_bytes<P: AsRef<Path>>(bytes: Vec<u8>, path: P) -> IngestResult<Workbook> {
    let path = path.as_ref();
    let mut excel =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|source| IngestError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    // One undecodable sheet fails the whole workbook
    let mut sheets = Vec::new();
    for sheet_name in excel.sheet_names() {
        let range = excel
            .worksheet_range(&sheet_name)
            .map_err(|source| IngestError::Sheet {
                path: path.to_path_buf(),
                sheet: sheet_name.clone(),
                source,
            })?;
        sheets.push(parse_sheet(&sheet_name, &range));
    }

    Ok(Workbook {
        path: path.to_path_buf(),
        sheets,
    })
}

fn parse_sheet(name: &str, range: &Range<Data>) -> Sheet {
    // calamine trims leading empty rows/columns; rebuild the grid from A1 so
    // positional row indices keep their layout meaning.
    let Some((max_row, max_col)) = range.end() else {
        return Sheet::new(name);
    };

    let rows = (0..=max_row)
        .map(|row| {
            (0..=max_col)
                .map(|col| {
                    range
                        .get_value((row, col))
                        .map(parse_cell_value)
                        .unwrap_or(CellValue::Empty)
                })
                .collect()
        })
        .collect();

    Sheet::from_rows(name, rows)
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
