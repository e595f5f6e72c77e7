//! Input workbook templates in the fixed dashboard layout

use crate::dataset::SheetKind;
use crate::discovery::file_name_for;
use crate::reader::CellValue;
use crate::store::DatasetKey;
use crate::violation::CellReference;
use crate::writer::{self, SheetSpec, default_rag_metrics, rag_sheet};
use anyhow::{Result, bail};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

/// Functions with a defined sheet structure
pub const SUPPORTED_FUNCTIONS: [&str; 1] = ["KAM"];

/// Fiscal year whose template carries sample achievements
pub const SAMPLE_FISCAL_YEAR: u32 = 26;

const MONTHS: [&str; 12] = [
    "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec", "Jan", "Feb", "Mar",
];

// Sample data for KAM FY26
const SAMPLE_BILLING: [Option<f64>; 12] = [
    Some(23.0), Some(30.0), Some(11.0), Some(33.0), Some(41.0), Some(11.0),
    Some(3.0), Some(1.0), Some(1.0), Some(33.0), None, None,
];
const SAMPLE_COLLECTION: [Option<f64>; 12] = [
    Some(32.0), Some(12.0), Some(32.0), Some(12.0), Some(22.0), Some(22.0),
    Some(23.0), Some(44.0), Some(30.0), Some(32.0), None, None,
];
const SAMPLE_QBRS: [f64; 4] = [22.0, 21.0, 20.0, 15.0];
const SAMPLE_HERO_STORIES: [f64; 4] = [22.0, 21.0, 20.0, 15.0];
const SAMPLE_ARR: [f64; 4] = [5.2, 6.8, 4.53, 2.5];
const SAMPLE_SERVICE_REV: [f64; 4] = [30.5, 31.2, 35.8, 23.5];
const SAMPLE_OPEN_PIPELINE: f64 = 150.0;
/// (label, target, sample achievement)
const ANNUAL_KPIS: [(&str, f64, f64); 3] = [
    ("NDR", 1.20, 1.15),
    ("GDR", 0.95, 0.88),
    ("NPS Score", 30.0, -11.0),
];
/// (owner, ARR achievement, billing, collection)
const SAMPLE_OWNERS: [(&str, f64, f64, f64); 10] = [
    ("Ansu Jain", 0.78, 15.68, 15.82),
    ("Apoorv Anand", 2.09, 17.67, 20.75),
    ("Bhavik Solani", 0.70, 48.31, 50.37),
    ("Bhavna Sharma", 0.0, 22.27, 27.64),
    ("Neel Neogi", -0.85, 2.92, 3.45),
    ("Rajeswari Das", -0.40, 0.0, 0.0),
    ("Rushi", 1.20, 13.37, 16.02),
    ("Sachin Gupta", -2.42, 0.36, 1.84),
    ("Samprus Mascaren", -1.60, 13.54, 15.75),
    ("Vishwanath Gurav", 19.53, 65.99, 77.98),
];
const WEIGHTAGES: [(&str, &str, f64); 10] = [
    ("arr", "ARR", 25.0),
    ("serviceRev", "Service Revenue", 20.0),
    ("ndr", "NDR", 10.0),
    ("gdr", "GDR", 10.0),
    ("nps", "NPS Score", 5.0),
    ("billing", "On-time Billing", 15.0),
    ("collection", "On-time Collection", 10.0),
    ("qbr", "QBRs Held", 3.0),
    ("heroStories", "Hero Stories", 2.0),
    ("pipelineCoverage", "Pipeline Coverage", 0.0),
];

fn fiscal_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^FY(\d{2})$").expect("fiscal year pattern is valid"))
}

/// Two-digit year of an `FYnn` label
pub fn parse_fiscal_year(fiscal_year: &str) -> Result<u32> {
    let Some(caps) = fiscal_year_pattern().captures(fiscal_year.trim()) else {
        bail!(
            "Invalid FY format: \"{}\". Expected format: FY26, FY27, etc.",
            fiscal_year
        );
    };
    Ok(caps[1].parse()?)
}

/// Apr..Dec of `fy`, then Jan..Mar of the following year
pub fn month_labels(fy: u32) -> Vec<String> {
    MONTHS
        .iter()
        .enumerate()
        .map(|(i, month)| {
            let year = if i < 9 { fy } else { (fy + 1) % 100 };
            format!("{}'{:02}", month, year)
        })
        .collect()
}

pub fn quarter_labels(fy: u32) -> Vec<String> {
    (1..=4).map(|q| format!("Q{} FY{:02}", q, fy)).collect()
}

fn blank_or(value: Option<f64>) -> CellValue {
    value.map(CellValue::Number).unwrap_or(CellValue::Empty)
}

/// Title row, blank row, header row
fn layout_header(title: &str, headers: &[&str]) -> Vec<Vec<CellValue>> {
    vec![
        vec![CellValue::text(title)],
        vec![],
        headers.iter().map(|h| CellValue::text(*h)).collect(),
    ]
}

fn layout_sheet(
    kind: SheetKind,
    title: &str,
    headers: &[&str],
    data: Vec<Vec<CellValue>>,
    widths: &[f64],
) -> SheetSpec {
    let mut rows = layout_header(title, headers);
    rows.extend(data);
    // Title spans the header columns
    let title_end = CellReference::new(0, headers.len().saturating_sub(1) as u32);
    SheetSpec::new(kind.sheet_name(), rows)
        .with_column_widths(widths)
        .with_merge(format!("A1:{}", title_end))
}

fn monthly_sheet(
    kind: SheetKind,
    title: &str,
    months: &[String],
    target: f64,
    achievements: &[Option<f64>; 12],
    sample: bool,
) -> SheetSpec {
    let data = months
        .iter()
        .zip(achievements)
        .map(|(month, achieved)| {
            vec![
                CellValue::text(month.as_str()),
                target.into(),
                blank_or(achieved.filter(|_| sample)),
            ]
        })
        .collect();
    layout_sheet(
        kind,
        title,
        &["Month", "Target INR Cr", "Achievement INR Cr"],
        data,
        &[12.0, 18.0, 22.0],
    )
}

fn quarterly_sheet(
    kind: SheetKind,
    title: &str,
    quarters: &[String],
    target: f64,
    achievements: &[f64; 4],
    sample: bool,
) -> SheetSpec {
    let data = quarters
        .iter()
        .zip(achievements)
        .map(|(quarter, achieved)| {
            vec![
                CellValue::text(quarter.as_str()),
                target.into(),
                blank_or(Some(*achieved).filter(|_| sample)),
            ]
        })
        .collect();
    layout_sheet(
        kind,
        title,
        &["Quarter", "Target", "Achievement"],
        data,
        &[12.0, 12.0, 14.0],
    )
}

fn instructions_sheet(function: &str, fy_label: &str) -> SheetSpec {
    let file_name = file_name_for(&DatasetKey::new(function, fy_label));
    let lines = [
        format!("{} Dashboard - Input File Instructions", function),
        String::new(),
        format!("Generated for: {} {}", function, fy_label),
        String::new(),
        "HOW TO UPDATE THE DASHBOARD:".to_string(),
        "1. Edit the data in any of the sheets (Annual KPIs, Monthly Billing, Monthly Collection, Quarterly QBRs, Hero Stories, Quarterly ARR & Service Rev, Account Owners, Weightages)".to_string(),
        "2. Save this Excel file".to_string(),
        "3. The dashboard picks up the change within a few seconds".to_string(),
        String::new(),
        "IMPORTANT RULES:".to_string(),
        "- Do NOT rename the sheets".to_string(),
        "- Do NOT change the column headers (Row 3 in each sheet)".to_string(),
        "- Keep the same row structure (months, quarters, etc.)".to_string(),
        "- Leave cells EMPTY (not zero) for months with no data yet".to_string(),
        "- Weightages MUST total 100%".to_string(),
        "- Check the file with: okrlint <file>".to_string(),
        String::new(),
        "SHEET DESCRIPTIONS:".to_string(),
        "  Annual KPIs       -> NDR, GDR, NPS Score and the open pipeline".to_string(),
        "  Monthly Billing   -> On-time billing target vs achievement (Apr-Mar)".to_string(),
        "  Monthly Collection-> On-time collection target vs achievement (Apr-Mar)".to_string(),
        "  Quarterly QBRs    -> QBRs held per quarter (Q1-Q4)".to_string(),
        "  Hero Stories      -> Hero stories delivered per quarter (Q1-Q4)".to_string(),
        "  Quarterly ARR & Service Rev -> Quarterly ARR and Service Revenue breakdown (Q1-Q4)".to_string(),
        "  Account Owners    -> Per-account-owner YTD performance".to_string(),
        "  Weightages        -> OKR metric weights (must total 100)".to_string(),
        "  RAG Metrics       -> Red/Amber/Green status of qualitative metrics".to_string(),
        String::new(),
        "GENERATING TEMPLATES:".to_string(),
        "  okrcli template                (KAM FY26 with sample data)".to_string(),
        "  okrcli template FY27           (KAM FY27 with empty achievements)".to_string(),
        "  okrcli template KAM FY28       (KAM FY28 with empty achievements)".to_string(),
        String::new(),
        "FILE NAMING:".to_string(),
        format!("  This file: {}", file_name),
        "  Pattern: {FUNCTION}_Dashboard_FY{NN}.xlsx".to_string(),
        "  Files matching this pattern are discovered automatically.".to_string(),
    ];

    let rows = lines.into_iter().map(|line| vec![CellValue::from(line)]).collect();
    SheetSpec::new("Instructions", rows).with_column_widths(&[100.0])
}

/// Sheets of a new input workbook for `function` and `fiscal_year`.
///
/// Achievements are filled with sample data only for KAM FY26; other years
/// keep the targets and leave achievements blank.
pub fn build_template(function: &str, fiscal_year: &str) -> Result<Vec<SheetSpec>> {
    let function = function.trim().to_uppercase();
    if !SUPPORTED_FUNCTIONS.contains(&function.as_str()) {
        bail!(
            "Function \"{}\" is not yet supported. Currently supported functions: {}",
            function,
            SUPPORTED_FUNCTIONS.join(", ")
        );
    }

    let fy = parse_fiscal_year(fiscal_year)?;
    let fy_label = format!("FY{:02}", fy);
    let sample = fy == SAMPLE_FISCAL_YEAR;
    let months = month_labels(fy);
    let quarters = quarter_labels(fy);

    let mut annual: Vec<Vec<CellValue>> = ANNUAL_KPIS
        .iter()
        .map(|(label, target, achieved)| {
            vec![
                CellValue::text(*label),
                (*target).into(),
                blank_or(Some(*achieved).filter(|_| sample)),
            ]
        })
        .collect();
    annual.push(vec![]);
    annual.push(vec![
        CellValue::text("Open Pipeline as of Date (₹ Cr)"),
        CellValue::Empty,
        blank_or(Some(SAMPLE_OPEN_PIPELINE).filter(|_| sample)),
    ]);

    let arr_service_rev = quarters
        .iter()
        .enumerate()
        .map(|(i, quarter)| {
            vec![
                CellValue::text(quarter.as_str()),
                14.35.into(),
                blank_or(Some(SAMPLE_ARR[i]).filter(|_| sample)),
                32.75.into(),
                blank_or(Some(SAMPLE_SERVICE_REV[i]).filter(|_| sample)),
            ]
        })
        .collect();

    let owners = SAMPLE_OWNERS
        .iter()
        .map(|(name, arr, billing, collection)| {
            // Names carry over; figures only for the sample year
            let figure = |v: f64| blank_or(Some(v).filter(|_| sample));
            vec![
                CellValue::text(*name),
                figure(*arr),
                figure(*billing),
                figure(*collection),
            ]
        })
        .collect();

    let weightages = WEIGHTAGES
        .iter()
        .map(|(key, label, weight)| {
            vec![CellValue::text(*key), CellValue::text(*label), (*weight).into()]
        })
        .collect();

    let annual_title = format!("{} Dashboard - Annual KPIs", function);
    let target_header = format!("Target {}", fy_label);

    Ok(vec![
        layout_sheet(
            SheetKind::AnnualKpis,
            &annual_title,
            &["Metric", target_header.as_str(), "Achievement Till Date"],
            annual,
            &[22.0, 18.0, 22.0],
        ),
        monthly_sheet(
            SheetKind::MonthlyBilling,
            "On-Time Billing (INR Cr)",
            &months,
            25.0,
            &SAMPLE_BILLING,
            sample,
        ),
        monthly_sheet(
            SheetKind::MonthlyCollection,
            "On-Time Collection (INR Cr)",
            &months,
            30.0,
            &SAMPLE_COLLECTION,
            sample,
        ),
        quarterly_sheet(
            SheetKind::QuarterlyQbrs,
            "QBRs Held",
            &quarters,
            25.0,
            &SAMPLE_QBRS,
            sample,
        ),
        quarterly_sheet(
            SheetKind::HeroStories,
            "Hero Stories",
            &quarters,
            25.0,
            &SAMPLE_HERO_STORIES,
            sample,
        ),
        layout_sheet(
            SheetKind::QuarterlyArrServiceRev,
            "Quarterly ARR & Service Revenue (INR Cr)",
            &[
                "Quarter",
                "ARR Target",
                "ARR Achievement",
                "Service Rev Target",
                "Service Rev Achievement",
            ],
            arr_service_rev,
            &[12.0, 16.0, 18.0, 18.0, 22.0],
        ),
        layout_sheet(
            SheetKind::AccountOwners,
            "Account Owner Performance (YTD)",
            &[
                "Account Owner",
                "ARR Achievement (Cr)",
                "Billing (Cr)",
                "Collection (Cr)",
            ],
            owners,
            &[22.0, 22.0, 16.0, 18.0],
        ),
        layout_sheet(
            SheetKind::Weightages,
            "OKR Weightages (Must total 100)",
            &["Metric Key", "Metric Label", "Weight (%)"],
            weightages,
            &[18.0, 22.0, 14.0],
        ),
        rag_sheet(&default_rag_metrics()),
        instructions_sheet(&function, &fy_label),
    ])
}

/// Write the template into `dir` as `{FUNCTION}_Dashboard_FY{NN}.xlsx`
pub fn write_template<P: AsRef<Path>>(dir: P, function: &str, fiscal_year: &str) -> Result<PathBuf> {
    let sheets = build_template(function, fiscal_year)?;
    let key = DatasetKey::new(function.trim(), format!("FY{:02}", parse_fiscal_year(fiscal_year)?));
    let path = dir.as_ref().join(file_name_for(&key));

    writer::write_workbook(&path, &sheets)?;
    info!(path = %path.display(), %key, sheets = sheets.len(), "template written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_and_quarter_labels() {
        let months = month_labels(26);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], "Apr'26");
        assert_eq!(months[8], "Dec'26");
        assert_eq!(months[9], "Jan'27");
        assert_eq!(months[11], "Mar'27");
        assert_eq!(month_labels(99)[9], "Jan'00");
        assert_eq!(quarter_labels(27), vec!["Q1 FY27", "Q2 FY27", "Q3 FY27", "Q4 FY27"]);
    }

    #[test]
    fn test_fiscal_year_validation() {
        assert_eq!(parse_fiscal_year("FY26").unwrap(), 26);
        assert_eq!(parse_fiscal_year("fy07").unwrap(), 7);
        assert!(parse_fiscal_year("FY2026").is_err());
        assert!(parse_fiscal_year("2026").is_err());
        assert!(build_template("KAM", "FY6").is_err());
    }

    #[test]
    fn test_only_kam_supported() {
        assert!(build_template("kam", "FY26").is_ok());
        let err = build_template("Sales", "FY26").unwrap_err();
        assert!(err.to_string().contains("SALES"));
    }

    #[test]
    fn test_sheet_order_and_layout() {
        let sheets = build_template("KAM", "FY26").unwrap();
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        let mut expected: Vec<&str> = SheetKind::DATA_SHEETS.iter().map(|k| k.sheet_name()).collect();
        expected.extend(["RAG Metrics", "Instructions"]);
        assert_eq!(names, expected);

        let billing = &sheets[1];
        assert_eq!(billing.rows[0][0], CellValue::text("On-Time Billing (INR Cr)"));
        assert_eq!(billing.rows[2][2], CellValue::text("Achievement INR Cr"));
        assert_eq!(billing.rows[3][0], CellValue::text("Apr'26"));
        assert_eq!(billing.rows[14][2], CellValue::Empty);
        assert_eq!(billing.merges, vec!["A1:C1"]);
        assert_eq!(sheets[5].merges, vec!["A1:E1"]);
        assert_eq!(sheets[6].merges, vec!["A1:D1"]);
    }

    #[test]
    fn test_other_years_have_blank_achievements() {
        let sheets = build_template("KAM", "FY27").unwrap();
        let annual = &sheets[0];
        assert_eq!(annual.rows[2][1], CellValue::text("Target FY27"));
        assert_eq!(annual.rows[3][1], CellValue::Number(1.2));
        assert_eq!(annual.rows[3][2], CellValue::Empty);

        let owners = &sheets[6];
        assert_eq!(owners.rows.len(), 13);
        assert_eq!(owners.rows[3][0], CellValue::text("Ansu Jain"));
        assert!(owners.rows[3][1..].iter().all(CellValue::is_empty));

        let total: f64 = sheets[7]
            .rows
            .iter()
            .skip(3)
            .map(|r| match r[2] {
                CellValue::Number(n) => n,
                _ => 0.0,
            })
            .sum();
        assert_eq!(total, 100.0);
    }
}
