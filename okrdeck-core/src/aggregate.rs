//! Aggregator: composite fields derived once every sheet parser has run

use crate::dataset::{
    AnnualMetric, Dataset, MetricTotals, MonthlyMetric, PipelineCoverage, QuarterlyMetric,
    SheetKind, ratio_or_zero, total,
};
use crate::parse;
use crate::reader::Workbook;

pub const ARR_LABEL: &str = "ARR INR Cr";
pub const SERVICE_REV_LABEL: &str = "Service Rev INR Cr";
pub const CRORE_UNIT: &str = "Cr";

/// Build the full dataset for one workbook. Pure; absent sheets only drop
/// their own fields.
pub fn build_dataset(workbook: &Workbook) -> Dataset {
    let sheet = |kind: SheetKind| workbook.get_sheet(kind.sheet_name());

    let annual = sheet(SheetKind::AnnualKpis)
        .map(parse::parse_annual)
        .unwrap_or_default();

    let mut dataset = Dataset {
        annual_metrics: annual.metrics,
        monthly_billing: sheet(SheetKind::MonthlyBilling).map(parse::parse_monthly),
        monthly_collection: sheet(SheetKind::MonthlyCollection).map(parse::parse_monthly),
        quarterly_qbrs: sheet(SheetKind::QuarterlyQbrs).map(parse::parse_quarterly),
        quarterly_hero_stories: sheet(SheetKind::HeroStories).map(parse::parse_quarterly),
        account_owner_performance: sheet(SheetKind::AccountOwners)
            .map(parse::parse_owner_performance),
        weightages: sheet(SheetKind::Weightages).map(parse::parse_weightages),
        rag_metrics: sheet(SheetKind::RagMetrics).map(parse::parse_rag_metrics),
        ..Default::default()
    };

    if let Some((arr, service_rev)) =
        sheet(SheetKind::QuarterlyArrServiceRev).map(parse::parse_quarterly_pair)
    {
        dataset.quarterly_arr = Some(arr);
        dataset.quarterly_service_rev = Some(service_rev);
    }

    dataset.billing_totals = dataset.monthly_billing.as_deref().map(metric_totals);
    dataset.collection_totals = dataset.monthly_collection.as_deref().map(metric_totals);

    dataset.annual_metrics.arr = dataset
        .quarterly_arr
        .as_deref()
        .and_then(|series| sum_quarterly(series, ARR_LABEL, CRORE_UNIT));
    dataset.annual_metrics.service_rev = dataset
        .quarterly_service_rev
        .as_deref()
        .and_then(|series| sum_quarterly(series, SERVICE_REV_LABEL, CRORE_UNIT));

    dataset.pipeline_coverage =
        pipeline_coverage(annual.open_pipeline, dataset.annual_metrics.arr.as_ref());

    dataset
}

/// Totals over a monthly series. Every month counts toward the target; only
/// reported months count toward the achievement.
pub fn metric_totals(months: &[MonthlyMetric]) -> MetricTotals {
    let total_target = total(months.iter().map(|m| m.target));
    let total_achievement = total(months.iter().filter_map(|m| m.achievement));

    MetricTotals {
        total_target,
        total_achievement,
        achievement_percentage: ratio_or_zero(total_achievement, total_target),
    }
}

/// Annual figure from a quarterly series: column sums, never averaged
/// percentages. `None` for an empty series.
pub fn sum_quarterly(series: &[QuarterlyMetric], label: &str, unit: &str) -> Option<AnnualMetric> {
    if series.is_empty() {
        return None;
    }

    Some(AnnualMetric {
        label: label.to_string(),
        target_fy: total(series.iter().map(|q| q.target)),
        achievement_till_date: total(series.iter().map(|q| q.achievement)),
        unit: unit.to_string(),
    })
}

/// Coverage of the remaining ARR gap by the open pipeline; 0 once the target is met
pub fn pipeline_coverage(open_pipeline: f64, arr: Option<&AnnualMetric>) -> PipelineCoverage {
    let Some(arr) = arr else {
        return PipelineCoverage {
            open_pipeline,
            remaining_target: 0.0,
            coverage: 0.0,
        };
    };

    let remaining = arr.target_fy - arr.achievement_till_date;
    PipelineCoverage {
        open_pipeline,
        remaining_target: remaining.max(0.0),
        coverage: ratio_or_zero(open_pipeline, remaining),
    }
}
