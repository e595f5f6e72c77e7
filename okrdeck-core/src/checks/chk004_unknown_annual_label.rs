//! CHK004: Unrecognised label in the Annual KPIs sheet

use super::LayoutCheck;
use crate::dataset::{AnnualMetricKey, SheetKind};
use crate::parse::{cell_label, is_pipeline_label, record_rows};
use crate::reader::Workbook;
use crate::violation::{CellReference, Severity, Violation, ViolationScope};
use anyhow::Result;

pub struct UnknownAnnualLabelCheck;

impl LayoutCheck for UnknownAnnualLabelCheck {
    fn id(&self) -> &str {
        "CHK004"
    }

    fn name(&self) -> &str {
        "Unrecognised annual KPI"
    }

    fn check(&self, workbook: &Workbook) -> Result<Vec<Violation>> {
        let Some(sheet) = workbook.get_sheet(SheetKind::AnnualKpis.sheet_name()) else {
            return Ok(Vec::new());
        };

        let known = AnnualMetricKey::ALL
            .iter()
            .map(|k| k.label())
            .collect::<Vec<_>>()
            .join(", ");

        let violations = record_rows(sheet)
            .filter_map(|(row_idx, row)| {
                let label = cell_label(&row[0]);
                if AnnualMetricKey::from_label(&label).is_some() || is_pipeline_label(&label) {
                    return None;
                }
                Some(Violation::new(
                    self.id(),
                    ViolationScope::Cell(
                        sheet.name.clone(),
                        CellReference::new(row_idx as u32, 0),
                    ),
                    format!(
                        "Annual KPI '{}' is not recognised and is ignored (expected {})",
                        label, known
                    ),
                    Severity::Info,
                ))
            })
            .collect();

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{CellValue, Sheet};

    #[test]
    fn test_unknown_labels() {
        let sheet = Sheet::from_rows(
            "Annual KPIs",
            vec![
                vec!["KAM Dashboard - Annual KPIs".into()],
                vec![],
                vec!["Metric".into(), "Target FY26".into(), "Achievement Till Date".into()],
                vec!["ARR INR Cr".into(), 57.4.into(), 19.03.into()],
                vec!["NDR".into(), 1.2.into(), 1.15.into()],
                // Labels match exactly
                vec!["nps score".into(), 30.0.into(), (-11.0).into()],
                vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
                vec!["Open Pipeline as of Date (₹ Cr)".into(), CellValue::Empty, 150.0.into()],
            ],
        );
        let workbook = Workbook {
            sheets: vec![sheet],
            ..Default::default()
        };

        let violations = UnknownAnnualLabelCheck.check(&workbook).unwrap();
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.starts_with("Annual KPI 'ARR INR Cr'"));
        assert!(violations[0].message.contains("NDR, GDR, NPS Score"));
        assert_eq!(
            violations[1].scope,
            ViolationScope::Cell("Annual KPIs".into(), CellReference::new(5, 0))
        );
    }
}
