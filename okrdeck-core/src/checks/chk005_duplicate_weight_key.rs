//! CHK005: Weightage key listed more than once

use super::LayoutCheck;
use crate::dataset::SheetKind;
use crate::parse::{cell_label, record_rows};
use crate::reader::Workbook;
use crate::violation::{CellReference, Severity, Violation, ViolationScope};
use anyhow::Result;
use std::collections::HashMap;

pub struct DuplicateWeightKeyCheck;

impl LayoutCheck for DuplicateWeightKeyCheck {
    fn id(&self) -> &str {
        "CHK005"
    }

    fn name(&self) -> &str {
        "Duplicate weightage key"
    }

    fn check(&self, workbook: &Workbook) -> Result<Vec<Violation>> {
        let Some(sheet) = workbook.get_sheet(SheetKind::Weightages.sheet_name()) else {
            return Ok(Vec::new());
        };

        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut violations = Vec::new();

        for (row_idx, row) in record_rows(sheet) {
            let key = cell_label(&row[0]);
            match first_seen.get(&key) {
                Some(first) => violations.push(Violation::new(
                    self.id(),
                    ViolationScope::Cell(
                        sheet.name.clone(),
                        CellReference::new(row_idx as u32, 0),
                    ),
                    format!(
                        "Weightage key '{}' repeats row {}; this row replaces it",
                        key,
                        first + 1
                    ),
                    Severity::Warning,
                )),
                None => {
                    first_seen.insert(key, row_idx);
                }
            }
        }

        Ok(violations)
    }
}
