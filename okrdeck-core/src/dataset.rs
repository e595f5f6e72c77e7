//! Dataset model: typed records parsed from the dashboard sheets and the
//! composite dataset served to the dashboard.
//!
//! Field names serialize in camelCase; the JSON produced here is the wire
//! contract consumed by the dashboard front end.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed, case-sensitive sheet names of an input workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SheetKind {
    AnnualKpis,
    MonthlyBilling,
    MonthlyCollection,
    QuarterlyQbrs,
    HeroStories,
    QuarterlyArrServiceRev,
    AccountOwners,
    Weightages,
    RagMetrics,
}

impl SheetKind {
    /// Sheets every input workbook is expected to carry
    pub const DATA_SHEETS: [SheetKind; 8] = [
        SheetKind::AnnualKpis,
        SheetKind::MonthlyBilling,
        SheetKind::MonthlyCollection,
        SheetKind::QuarterlyQbrs,
        SheetKind::HeroStories,
        SheetKind::QuarterlyArrServiceRev,
        SheetKind::AccountOwners,
        SheetKind::Weightages,
    ];

    pub fn sheet_name(&self) -> &'static str {
        match self {
            SheetKind::AnnualKpis => "Annual KPIs",
            SheetKind::MonthlyBilling => "Monthly Billing",
            SheetKind::MonthlyCollection => "Monthly Collection",
            SheetKind::QuarterlyQbrs => "Quarterly QBRs",
            SheetKind::HeroStories => "Hero Stories",
            SheetKind::QuarterlyArrServiceRev => "Quarterly ARR & Service Rev",
            SheetKind::AccountOwners => "Account Owners",
            SheetKind::Weightages => "Weightages",
            SheetKind::RagMetrics => "RAG Metrics",
        }
    }

    /// Dataset fields that disappear when this sheet is missing
    pub fn dataset_fields(&self) -> &'static [&'static str] {
        match self {
            SheetKind::AnnualKpis => &["annualMetrics.ndr", "annualMetrics.gdr", "annualMetrics.nps"],
            SheetKind::MonthlyBilling => &["monthlyBilling", "billingTotals"],
            SheetKind::MonthlyCollection => &["monthlyCollection", "collectionTotals"],
            SheetKind::QuarterlyQbrs => &["quarterlyQBRs"],
            SheetKind::HeroStories => &["quarterlyHeroStories"],
            SheetKind::QuarterlyArrServiceRev => &[
                "quarterlyARR",
                "quarterlyServiceRev",
                "annualMetrics.arr",
                "annualMetrics.serviceRev",
            ],
            SheetKind::AccountOwners => &["accountOwnerPerformance"],
            SheetKind::Weightages => &["weightages"],
            SheetKind::RagMetrics => &["ragMetrics"],
        }
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// Annual KPIs parsed directly from the "Annual KPIs" sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnualMetricKey {
    Ndr,
    Gdr,
    Nps,
}

impl AnnualMetricKey {
    pub const ALL: [AnnualMetricKey; 3] =
        [AnnualMetricKey::Ndr, AnnualMetricKey::Gdr, AnnualMetricKey::Nps];

    /// Exact-match lookup of a sheet label
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "NDR" => Some(AnnualMetricKey::Ndr),
            "GDR" => Some(AnnualMetricKey::Gdr),
            "NPS Score" => Some(AnnualMetricKey::Nps),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnnualMetricKey::Ndr => "NDR",
            AnnualMetricKey::Gdr => "GDR",
            AnnualMetricKey::Nps => "NPS Score",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            AnnualMetricKey::Ndr => "ndr",
            AnnualMetricKey::Gdr => "gdr",
            AnnualMetricKey::Nps => "nps",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            AnnualMetricKey::Ndr | AnnualMetricKey::Gdr => "x",
            AnnualMetricKey::Nps => "",
        }
    }
}

/// One month of target vs. achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetric {
    pub month: String,
    pub target: f64,
    /// `None` means not yet reported, distinct from a reported zero
    pub achievement: Option<f64>,
    pub percentage: Option<f64>,
}

impl MonthlyMetric {
    pub fn new(month: impl Into<String>, target: f64, achievement: Option<f64>) -> Self {
        let percentage = match achievement {
            Some(a) if target > 0.0 => Some(a / target),
            _ => None,
        };
        Self {
            month: month.into(),
            target,
            achievement,
            percentage,
        }
    }
}

/// One quarter of target vs. achievement; achievement is always reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyMetric {
    pub quarter: String,
    pub target: f64,
    pub achievement: f64,
    pub percentage: f64,
}

impl QuarterlyMetric {
    pub fn new(quarter: impl Into<String>, target: f64, achievement: f64) -> Self {
        Self {
            quarter: quarter.into(),
            target,
            achievement,
            percentage: ratio_or_zero(achievement, target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualMetric {
    pub label: String,
    #[serde(rename = "targetFY")]
    pub target_fy: f64,
    pub achievement_till_date: f64,
    pub unit: String,
}

/// Annual metrics by key; `arr` and `service_rev` are derived from the quarterly breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndr: Option<AnnualMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gdr: Option<AnnualMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nps: Option<AnnualMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arr: Option<AnnualMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_rev: Option<AnnualMetric>,
}

impl AnnualMetrics {
    pub fn get(&self, key: AnnualMetricKey) -> Option<&AnnualMetric> {
        match key {
            AnnualMetricKey::Ndr => self.ndr.as_ref(),
            AnnualMetricKey::Gdr => self.gdr.as_ref(),
            AnnualMetricKey::Nps => self.nps.as_ref(),
        }
    }

    pub fn insert(&mut self, key: AnnualMetricKey, metric: AnnualMetric) {
        let slot = match key {
            AnnualMetricKey::Ndr => &mut self.ndr,
            AnnualMetricKey::Gdr => &mut self.gdr,
            AnnualMetricKey::Nps => &mut self.nps,
        };
        *slot = Some(metric);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerPerformanceRecord {
    pub name: String,
    pub arr_achievement: f64,
    pub billing: f64,
    pub collection: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub key: String,
    pub label: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTotals {
    pub total_target: f64,
    pub total_achievement: f64,
    pub achievement_percentage: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCoverage {
    pub open_pipeline: f64,
    pub remaining_target: f64,
    pub coverage: f64,
}

/// Red/Amber/Green indicator for a qualitative metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RagStatus {
    Red,
    Amber,
    Green,
}

impl RagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RagStatus::Red => "red",
            RagStatus::Amber => "amber",
            RagStatus::Green => "green",
        }
    }
}

impl fmt::Display for RagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RagStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(RagStatus::Red),
            "amber" => Ok(RagStatus::Amber),
            "green" => Ok(RagStatus::Green),
            other => Err(format!(
                "invalid RAG value \"{}\", expected red, amber or green",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagMetric {
    pub key: String,
    pub label: String,
    pub status: RagStatus,
}

/// Parsed and aggregated contents of one input workbook
///
/// Built in full on every parse; sheet-derived fields are `None` when their
/// sheet is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub annual_metrics: AnnualMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_billing: Option<Vec<MonthlyMetric>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_collection: Option<Vec<MonthlyMetric>>,
    #[serde(default, rename = "quarterlyQBRs", skip_serializing_if = "Option::is_none")]
    pub quarterly_qbrs: Option<Vec<QuarterlyMetric>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarterly_hero_stories: Option<Vec<QuarterlyMetric>>,
    #[serde(default, rename = "quarterlyARR", skip_serializing_if = "Option::is_none")]
    pub quarterly_arr: Option<Vec<QuarterlyMetric>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarterly_service_rev: Option<Vec<QuarterlyMetric>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_owner_performance: Option<Vec<OwnerPerformanceRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weightages: Option<Vec<WeightRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_totals: Option<MetricTotals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_totals: Option<MetricTotals>,
    pub pipeline_coverage: PipelineCoverage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_metrics: Option<Vec<RagMetric>>,
}

impl Dataset {
    /// Sum of all weightages, `None` without a Weightages sheet.
    ///
    /// Input files are expected to total 100 but nothing enforces it; the sum
    /// is reported as-is.
    pub fn weight_total(&self) -> Option<f64> {
        self.weightages
            .as_ref()
            .map(|weights| total(weights.iter().map(|w| w.weight)))
    }
}

/// Sum starting from `+0.0`; `Iterator::sum` yields `-0.0` for no items
pub(crate) fn total(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, x| acc + x)
}

/// `numerator / denominator` for a positive denominator, otherwise 0
pub(crate) fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
