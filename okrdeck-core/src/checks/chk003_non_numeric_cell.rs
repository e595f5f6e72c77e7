//! CHK003: Non-numeric value in a numeric column

use super::LayoutCheck;
use crate::dataset::{AnnualMetricKey, SheetKind};
use crate::parse::{cell_label, coerce_number_or_zero, is_pipeline_label, record_rows};
use crate::reader::{CellValue, DATA_START_ROW, Sheet, Workbook};
use crate::violation::{CellReference, Severity, Violation, ViolationScope};
use anyhow::Result;

pub struct NonNumericCellCheck;

/// Columns read as numbers, per sheet
fn numeric_columns(kind: SheetKind) -> &'static [usize] {
    match kind {
        SheetKind::AnnualKpis
        | SheetKind::MonthlyBilling
        | SheetKind::MonthlyCollection
        | SheetKind::QuarterlyQbrs
        | SheetKind::HeroStories => &[1, 2],
        SheetKind::QuarterlyArrServiceRev => &[1, 2, 3, 4],
        SheetKind::AccountOwners => &[1, 2, 3],
        SheetKind::Weightages => &[2],
        SheetKind::RagMetrics => &[],
    }
}

/// A non-blank cell that does not hold a number; it still coerces to one
fn is_non_numeric(cell: &CellValue) -> bool {
    match cell {
        CellValue::Empty | CellValue::Number(_) => false,
        CellValue::Text(s) => {
            let s = s.trim();
            !s.is_empty() && !s.parse::<f64>().map(f64::is_finite).unwrap_or(false)
        }
        CellValue::Boolean(_) | CellValue::Error(_) => true,
    }
}

impl NonNumericCellCheck {
    fn check_sheet(&self, kind: SheetKind, sheet: &Sheet, violations: &mut Vec<Violation>) {
        let header_row = DATA_START_ROW - 1;

        for (row_idx, row) in record_rows(sheet) {
            if kind == SheetKind::AnnualKpis {
                // Only recognised KPI rows and the pipeline row are read
                let label = cell_label(&row[0]);
                if AnnualMetricKey::from_label(&label).is_none() && !is_pipeline_label(&label) {
                    continue;
                }
            }

            for &col in numeric_columns(kind) {
                let cell = sheet.cell(row_idx, col);
                if !is_non_numeric(cell) {
                    continue;
                }

                let header = cell_label(sheet.cell(header_row, col));
                let column = if header.is_empty() {
                    format!("column {}", col + 1)
                } else {
                    format!("'{}'", header)
                };
                violations.push(Violation::new(
                    self.id(),
                    ViolationScope::Cell(
                        sheet.name.clone(),
                        CellReference::new(row_idx as u32, col as u32),
                    ),
                    format!(
                        "Non-numeric value '{}' in {} reads as {}",
                        cell,
                        column,
                        coerce_number_or_zero(cell)
                    ),
                    Severity::Info,
                ));
            }
        }
    }
}

impl LayoutCheck for NonNumericCellCheck {
    fn id(&self) -> &str {
        "CHK003"
    }

    fn name(&self) -> &str {
        "Non-numeric cell"
    }

    fn check(&self, workbook: &Workbook) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        for kind in SheetKind::DATA_SHEETS {
            if let Some(sheet) = workbook.get_sheet(kind.sheet_name()) {
                self.check_sheet(kind, sheet, &mut violations);
            }
        }

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(name: &str, headers: &[&str], data: Vec<Vec<CellValue>>) -> Sheet {
        let mut rows = vec![
            vec![CellValue::text(format!("{} title", name))],
            vec![],
            headers.iter().map(|h| CellValue::text(*h)).collect(),
        ];
        rows.extend(data);
        Sheet::from_rows(name, rows)
    }

    #[test]
    fn test_non_numeric_detection() {
        assert!(is_non_numeric(&CellValue::text("n/a")));
        assert!(is_non_numeric(&CellValue::text("inf")));
        assert!(is_non_numeric(&CellValue::Error("#DIV/0!".into())));
        assert!(is_non_numeric(&CellValue::Boolean(true)));
        assert!(!is_non_numeric(&CellValue::text(" 12.5 ")));
        assert!(!is_non_numeric(&CellValue::text("   ")));
        assert!(!is_non_numeric(&CellValue::Empty));
        assert!(!is_non_numeric(&CellValue::Number(0.0)));
    }

    #[test]
    fn test_monthly_sheet_cells() {
        let sheet = layout(
            "Monthly Billing",
            &["Month", "Target INR Cr", "Achievement INR Cr"],
            vec![
                vec!["Apr'26".into(), 25.0.into(), "TBD".into()],
                vec!["May'26".into(), "twenty".into(), CellValue::Empty],
                // Skipped row: falsy first cell
                vec![CellValue::Empty, "junk".into(), "junk".into()],
            ],
        );
        let workbook = Workbook {
            sheets: vec![sheet],
            ..Default::default()
        };

        let violations = NonNumericCellCheck.check(&workbook).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(
            violations[0].scope,
            ViolationScope::Cell("Monthly Billing".into(), CellReference::new(3, 2))
        );
        assert_eq!(
            violations[0].message,
            "Non-numeric value 'TBD' in 'Achievement INR Cr' reads as 0"
        );
        assert_eq!(
            violations[1].scope,
            ViolationScope::Cell("Monthly Billing".into(), CellReference::new(4, 1))
        );
    }

    #[test]
    fn test_message_reports_coerced_value() {
        let sheet = layout(
            "Weightages",
            &["Key", "Label", "Weight"],
            vec![
                vec!["arr".into(), "ARR".into(), CellValue::Boolean(true)],
                vec!["nps".into(), "NPS".into(), CellValue::Boolean(false)],
                vec!["ndr".into(), "NDR".into(), CellValue::Error("#N/A".into())],
            ],
        );
        let workbook = Workbook {
            sheets: vec![sheet],
            ..Default::default()
        };

        let violations = NonNumericCellCheck.check(&workbook).unwrap();
        assert_eq!(violations.len(), 3);
        assert!(violations[0].message.ends_with("reads as 1"), "{}", violations[0].message);
        assert!(violations[1].message.ends_with("reads as 0"), "{}", violations[1].message);
        assert!(violations[2].message.ends_with("reads as 0"), "{}", violations[2].message);
    }

    #[test]
    fn test_annual_sheet_ignores_unread_rows() {
        let sheet = layout(
            "Annual KPIs",
            &["Metric", "Target FY26", "Achievement Till Date"],
            vec![
                vec!["NDR".into(), 1.2.into(), "soon".into()],
                vec!["Comment".into(), "free text".into(), "more".into()],
                vec!["Open Pipeline as of Date".into(), CellValue::Empty, "lots".into()],
            ],
        );
        let workbook = Workbook {
            sheets: vec![sheet],
            ..Default::default()
        };

        let violations = NonNumericCellCheck.check(&workbook).unwrap();
        let refs: Vec<String> = violations
            .iter()
            .map(|v| match &v.scope {
                ViolationScope::Cell(_, cell) => cell.to_excel_ref(),
                other => panic!("unexpected scope {:?}", other),
            })
            .collect();
        assert_eq!(refs, vec!["C4", "C6"]);
    }
}
