//! Layout findings with hierarchical scope (book, sheet, cell)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Severity level of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// Scope of a violation (book, sheet, or cell level)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationScope {
    Book,
    Sheet(String),
    Cell(String, CellReference),
}

impl ViolationScope {
    /// Get the sheet name if this is a sheet or cell scope
    pub fn sheet_name(&self) -> Option<&str> {
        match self {
            ViolationScope::Book => None,
            ViolationScope::Sheet(name) | ViolationScope::Cell(name, _) => Some(name),
        }
    }
}

impl PartialOrd for ViolationScope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Book first, then sheets by name, each sheet before its cells
impl Ord for ViolationScope {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ViolationScope::Book, ViolationScope::Book) => Ordering::Equal,
            (ViolationScope::Book, _) => Ordering::Less,
            (_, ViolationScope::Book) => Ordering::Greater,
            (ViolationScope::Sheet(a), ViolationScope::Sheet(b)) => a.cmp(b),
            (ViolationScope::Sheet(a), ViolationScope::Cell(b, _)) => {
                a.cmp(b).then(Ordering::Less)
            }
            (ViolationScope::Cell(a, _), ViolationScope::Sheet(b)) => {
                a.cmp(b).then(Ordering::Greater)
            }
            (ViolationScope::Cell(sheet_a, cell_a), ViolationScope::Cell(sheet_b, cell_b)) => {
                sheet_a.cmp(sheet_b).then_with(|| cell_a.cmp(cell_b))
            }
        }
    }
}

/// Zero-based cell position, shown as an A1 reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellReference {
    pub row: u32,
    pub col: u32,
}

impl CellReference {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert to Excel-style reference (e.g., "A1")
    pub fn to_excel_ref(&self) -> String {
        format!("{}{}", Self::col_to_letter(self.col), self.row + 1)
    }

    /// Convert column number to letter (0 -> A, 25 -> Z, 26 -> AA)
    fn col_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            result.insert(0, (b'A' + (col % 26) as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

impl PartialOrd for CellReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row.cmp(&other.row).then_with(|| self.col.cmp(&other.col))
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_excel_ref())
    }
}

/// A layout finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Check ID (e.g., "CHK001")
    pub check_id: String,
    pub scope: ViolationScope,
    pub message: String,
    pub severity: Severity,
}

impl Violation {
    pub fn new(
        check_id: impl Into<String>,
        scope: ViolationScope,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            check_id: check_id.into(),
            scope,
            message: message.into(),
            severity,
        }
    }
}

impl PartialOrd for Violation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Violation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.scope
            .cmp(&other.scope)
            .then_with(|| self.check_id.cmp(&other.check_id))
            .then_with(|| self.message.cmp(&other.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excel_refs() {
        assert_eq!(CellReference::new(0, 0).to_excel_ref(), "A1");
        assert_eq!(CellReference::new(3, 2).to_excel_ref(), "C4");
        assert_eq!(CellReference::new(9, 25).to_string(), "Z10");
        assert_eq!(CellReference::new(0, 26).to_excel_ref(), "AA1");
        assert_eq!(CellReference::new(0, 701).to_excel_ref(), "ZZ1");
        assert_eq!(CellReference::new(0, 702).to_excel_ref(), "AAA1");
    }

    #[test]
    fn test_hierarchical_order() {
        let cell = |sheet: &str, row, col| {
            ViolationScope::Cell(sheet.to_string(), CellReference::new(row, col))
        };
        let mut scopes = vec![
            cell("Weightages", 4, 2),
            ViolationScope::Sheet("Weightages".to_string()),
            cell("Annual KPIs", 3, 0),
            ViolationScope::Book,
            cell("Weightages", 3, 2),
            ViolationScope::Sheet("Annual KPIs".to_string()),
        ];
        scopes.sort();

        assert_eq!(
            scopes,
            vec![
                ViolationScope::Book,
                ViolationScope::Sheet("Annual KPIs".to_string()),
                cell("Annual KPIs", 3, 0),
                ViolationScope::Sheet("Weightages".to_string()),
                cell("Weightages", 3, 2),
                cell("Weightages", 4, 2),
            ]
        );
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
