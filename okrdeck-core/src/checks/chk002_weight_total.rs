//! CHK002: Weightages do not add up to the expected total

use super::LayoutCheck;
use crate::config::CheckConfig;
use crate::dataset::{SheetKind, total};
use crate::parse::parse_weightages;
use crate::reader::Workbook;
use crate::violation::{Severity, Violation, ViolationScope};
use anyhow::Result;

const TOLERANCE: f64 = 1e-6;

pub struct WeightTotalCheck {
    expected: f64,
}

impl WeightTotalCheck {
    pub fn new(config: &CheckConfig) -> Self {
        Self {
            expected: config.weight_total,
        }
    }
}

impl LayoutCheck for WeightTotalCheck {
    fn id(&self) -> &str {
        "CHK002"
    }

    fn name(&self) -> &str {
        "Weightage total"
    }

    fn check(&self, workbook: &Workbook) -> Result<Vec<Violation>> {
        let Some(sheet) = workbook.get_sheet(SheetKind::Weightages.sheet_name()) else {
            return Ok(Vec::new());
        };

        let weights = parse_weightages(sheet);
        let total = total(weights.iter().map(|w| w.weight));
        if (total - self.expected).abs() <= TOLERANCE {
            return Ok(Vec::new());
        }

        Ok(vec![Violation::new(
            self.id(),
            ViolationScope::Sheet(sheet.name.clone()),
            format!(
                "Weightages total {} instead of {} across {} metrics",
                total,
                self.expected,
                weights.len()
            ),
            Severity::Warning,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{CellValue, Sheet};

    fn weightages(rows: &[(&str, f64)]) -> Workbook {
        let mut grid = vec![
            vec![CellValue::text("OKR Weightages (Must total 100)")],
            vec![],
            vec!["Metric Key".into(), "Metric Label".into(), "Weight (%)".into()],
        ];
        grid.extend(
            rows.iter()
                .map(|(key, weight)| vec![(*key).into(), CellValue::Empty, (*weight).into()]),
        );
        Workbook {
            sheets: vec![Sheet::from_rows("Weightages", grid)],
            ..Default::default()
        }
    }

    #[test]
    fn test_total_reported_not_corrected() {
        let check = WeightTotalCheck::new(&CheckConfig::default());

        let exact = weightages(&[("arr", 60.0), ("ndr", 40.0)]);
        assert!(check.check(&exact).unwrap().is_empty());

        let short = weightages(&[("arr", 60.0), ("ndr", 30.0)]);
        let violations = check.check(&short).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].scope, ViolationScope::Sheet("Weightages".into()));
        assert!(violations[0].message.contains("total 90 instead of 100"));
    }

    #[test]
    fn test_duplicate_key_counts_once() {
        let check = WeightTotalCheck::new(&CheckConfig::default());
        // Later "arr" row replaces the earlier one: 70 + 30
        let workbook = weightages(&[("arr", 10.0), ("ndr", 30.0), ("arr", 70.0)]);
        assert!(check.check(&workbook).unwrap().is_empty());
    }

    #[test]
    fn test_configured_total_and_missing_sheet() {
        let mut config = CheckConfig::default();
        config.weight_total = 90.0;
        let check = WeightTotalCheck::new(&config);
        assert!(check.check(&weightages(&[("arr", 90.0)])).unwrap().is_empty());
        assert!(check.check(&Workbook::default()).unwrap().is_empty());
    }
}
