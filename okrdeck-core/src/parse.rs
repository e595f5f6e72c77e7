//! Sheet parsers: one sheet's cell grid in, one record sequence out.
//!
//! Every parser follows the fixed layout (title, blank, headers, data from
//! row 3) and skips data rows whose first cell is falsy. Malformed cells never
//! raise; numeric columns fall back to zero.

use crate::dataset::{
    AnnualMetric, AnnualMetricKey, AnnualMetrics, MonthlyMetric, OwnerPerformanceRecord,
    QuarterlyMetric, RagMetric, RagStatus, WeightRecord,
};
use crate::reader::{CellValue, Sheet};

/// Numeric value of a cell; blank, non-numeric and error cells read as 0
pub fn coerce_number_or_zero(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return 0.0;
            }
            match s.parse::<f64>() {
                Ok(n) if n.is_finite() => n,
                _ => 0.0,
            }
        }
        CellValue::Boolean(true) => 1.0,
        _ => 0.0,
    }
}

/// Like [`coerce_number_or_zero`] but a blank cell reads as "not reported"
pub fn coerce_number_or_null(cell: &CellValue) -> Option<f64> {
    if cell.is_blank() {
        None
    } else {
        Some(coerce_number_or_zero(cell))
    }
}

/// Trimmed text rendering of a label cell
pub fn cell_label(cell: &CellValue) -> String {
    cell.to_string().trim().to_string()
}

fn col(row: &[CellValue], idx: usize) -> &CellValue {
    static EMPTY: CellValue = CellValue::Empty;
    row.get(idx).unwrap_or(&EMPTY)
}

/// Data rows that carry a record (first cell truthy)
pub fn record_rows(sheet: &Sheet) -> impl Iterator<Item = (usize, &[CellValue])> {
    sheet
        .data_rows()
        .filter(|(_, row)| !col(row, 0).is_falsy())
}

pub fn parse_monthly(sheet: &Sheet) -> Vec<MonthlyMetric> {
    record_rows(sheet)
        .map(|(_, row)| {
            MonthlyMetric::new(
                cell_label(col(row, 0)),
                coerce_number_or_zero(col(row, 1)),
                coerce_number_or_null(col(row, 2)),
            )
        })
        .collect()
}

pub fn parse_quarterly(sheet: &Sheet) -> Vec<QuarterlyMetric> {
    record_rows(sheet)
        .map(|(_, row)| {
            QuarterlyMetric::new(
                cell_label(col(row, 0)),
                coerce_number_or_zero(col(row, 1)),
                coerce_number_or_zero(col(row, 2)),
            )
        })
        .collect()
}

/// Result of scanning the "Annual KPIs" sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnualSection {
    pub metrics: AnnualMetrics,
    /// Open pipeline value, 0 when no pipeline row exists
    pub open_pipeline: f64,
}

/// Whether a label names the open-pipeline row
pub fn is_pipeline_label(label: &str) -> bool {
    label.to_lowercase().contains("pipeline")
}

pub fn parse_annual(sheet: &Sheet) -> AnnualSection {
    let mut section = AnnualSection::default();

    for (_, row) in record_rows(sheet) {
        let label = cell_label(col(row, 0));
        if let Some(key) = AnnualMetricKey::from_label(&label) {
            section.metrics.insert(
                key,
                AnnualMetric {
                    label: label.clone(),
                    target_fy: coerce_number_or_zero(col(row, 1)),
                    achievement_till_date: coerce_number_or_zero(col(row, 2)),
                    unit: key.unit().to_string(),
                },
            );
        }
        if is_pipeline_label(&label) {
            // Achievement column first, target column as fallback
            let achieved = coerce_number_or_zero(col(row, 2));
            section.open_pipeline = if achieved != 0.0 {
                achieved
            } else {
                coerce_number_or_zero(col(row, 1))
            };
        }
    }

    section
}

pub fn parse_owner_performance(sheet: &Sheet) -> Vec<OwnerPerformanceRecord> {
    record_rows(sheet)
        .map(|(_, row)| OwnerPerformanceRecord {
            name: cell_label(col(row, 0)),
            arr_achievement: coerce_number_or_zero(col(row, 1)),
            billing: coerce_number_or_zero(col(row, 2)),
            collection: coerce_number_or_zero(col(row, 3)),
        })
        .collect()
}

pub fn parse_weightages(sheet: &Sheet) -> Vec<WeightRecord> {
    let mut weights: Vec<WeightRecord> = Vec::new();

    for (_, row) in record_rows(sheet) {
        let key = cell_label(col(row, 0));
        let label_cell = col(row, 1);
        let label = if label_cell.is_falsy() {
            key.clone()
        } else {
            cell_label(label_cell)
        };
        let record = WeightRecord {
            key,
            label,
            weight: coerce_number_or_zero(col(row, 2)),
        };

        // A repeated key replaces the earlier record in place
        match weights.iter_mut().find(|w| w.key == record.key) {
            Some(existing) => *existing = record,
            None => weights.push(record),
        }
    }

    weights
}

/// Parse the ARR & Service Revenue sheet: columns 1-2 feed the first series,
/// columns 3-4 the second
pub fn parse_quarterly_pair(sheet: &Sheet) -> (Vec<QuarterlyMetric>, Vec<QuarterlyMetric>) {
    let mut first = Vec::new();
    let mut second = Vec::new();

    for (_, row) in record_rows(sheet) {
        let quarter = cell_label(col(row, 0));
        first.push(QuarterlyMetric::new(
            quarter.clone(),
            coerce_number_or_zero(col(row, 1)),
            coerce_number_or_zero(col(row, 2)),
        ));
        second.push(QuarterlyMetric::new(
            quarter,
            coerce_number_or_zero(col(row, 3)),
            coerce_number_or_zero(col(row, 4)),
        ));
    }

    (first, second)
}

/// Header row of the "RAG Metrics" sheet; data follows immediately
pub const RAG_HEADER_ROW: usize = 0;

/// Parse the "RAG Metrics" sheet (key, label, value); rows with an
/// unrecognised status are skipped
pub fn parse_rag_metrics(sheet: &Sheet) -> Vec<RagMetric> {
    sheet
        .rows_from(RAG_HEADER_ROW + 1)
        .filter(|(_, row)| !col(row, 0).is_falsy())
        .filter_map(|(_, row)| {
            let key = cell_label(col(row, 0));
            let status: RagStatus = cell_label(col(row, 2)).parse().ok()?;
            let label_cell = col(row, 1);
            let label = if label_cell.is_falsy() {
                key.clone()
            } else {
                cell_label(label_cell)
            };
            Some(RagMetric { key, label, status })
        })
        .collect()
}
