//! CHK001: Expected data sheet missing

use super::LayoutCheck;
use crate::dataset::SheetKind;
use crate::reader::Workbook;
use crate::violation::{Severity, Violation, ViolationScope};
use anyhow::Result;

pub struct MissingSheetCheck;

impl LayoutCheck for MissingSheetCheck {
    fn id(&self) -> &str {
        "CHK001"
    }

    fn name(&self) -> &str {
        "Missing data sheet"
    }

    fn check(&self, workbook: &Workbook) -> Result<Vec<Violation>> {
        let missing: Vec<&SheetKind> = SheetKind::DATA_SHEETS
            .iter()
            .filter(|kind| workbook.get_sheet(kind.sheet_name()).is_none())
            .collect();

        // Nothing to ingest at all: probably not a dashboard workbook
        if missing.len() == SheetKind::DATA_SHEETS.len() {
            return Ok(vec![Violation::new(
                self.id(),
                ViolationScope::Book,
                "No dashboard sheets found; the dataset would be empty",
                Severity::Error,
            )]);
        }

        let violations = missing
            .into_iter()
            .map(|kind| {
                Violation::new(
                    self.id(),
                    ViolationScope::Book,
                    format!(
                        "Sheet '{}' not found; {} will be omitted",
                        kind.sheet_name(),
                        kind.dataset_fields().join(", ")
                    ),
                    Severity::Warning,
                )
            })
            .collect();

        Ok(violations)
    }
}
