use okrdeck_core::dataset::AnnualMetricKey;
use okrdeck_core::reader::CellValue;
use okrdeck_core::template::write_template;
use okrdeck_core::writer::{SheetSpec, write_workbook};
use okrdeck_core::{Checker, RagStatus, load_dataset};

const EPS: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

#[test]
fn test_sample_workbook_dataset() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_template(dir.path(), "KAM", "FY26")?;
    let dataset = load_dataset(&path)?;

    let billing = dataset.billing_totals.expect("billing totals");
    assert_eq!(billing.total_target, 300.0);
    assert_eq!(billing.total_achievement, 187.0);
    assert!(close(billing.achievement_percentage, 187.0 / 300.0));

    let collection = dataset.collection_totals.expect("collection totals");
    assert_eq!(collection.total_target, 360.0);
    assert_eq!(collection.total_achievement, 261.0);

    let months = dataset.monthly_billing.as_deref().expect("monthly billing");
    assert_eq!(months.len(), 12);
    assert_eq!(months[0].month, "Apr'26");
    assert_eq!(months[0].achievement, Some(23.0));
    assert_eq!(months[10].month, "Feb'27");
    assert_eq!(months[10].achievement, None);
    assert_eq!(months[10].percentage, None);

    let arr = dataset.annual_metrics.arr.as_ref().expect("ARR");
    assert_eq!(arr.label, "ARR INR Cr");
    assert!(close(arr.target_fy, 57.4));
    assert!(close(arr.achievement_till_date, 19.03));
    let service_rev = dataset.annual_metrics.service_rev.as_ref().expect("service revenue");
    assert!(close(service_rev.target_fy, 131.0));
    assert!(close(service_rev.achievement_till_date, 121.0));

    let nps = dataset
        .annual_metrics
        .get(AnnualMetricKey::Nps)
        .expect("NPS");
    assert_eq!(nps.target_fy, 30.0);
    assert_eq!(nps.achievement_till_date, -11.0);
    assert_eq!(nps.unit, "");

    let coverage = dataset.pipeline_coverage;
    assert_eq!(coverage.open_pipeline, 150.0);
    assert!(close(coverage.remaining_target, 57.4 - 19.03));
    assert!(close(coverage.coverage, 150.0 / (57.4 - 19.03)));

    assert_eq!(dataset.quarterly_qbrs.as_ref().map(Vec::len), Some(4));
    assert_eq!(dataset.account_owner_performance.as_ref().map(Vec::len), Some(10));
    assert_eq!(dataset.weight_total(), Some(100.0));

    let rag = dataset.rag_metrics.as_deref().expect("RAG metrics");
    assert_eq!(rag.len(), 3);
    assert!(rag.iter().all(|m| m.status == RagStatus::Red));

    Ok(())
}

#[test]
fn test_parsing_is_idempotent() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_template(dir.path(), "KAM", "FY26")?;

    let first = load_dataset(&path)?;
    let second = load_dataset(&path)?;
    assert_eq!(first, second);
    assert_eq!(serde_json::to_string(&first)?, serde_json::to_string(&second)?);

    Ok(())
}

#[test]
fn test_blank_year_has_no_achievements() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_template(dir.path(), "kam", "FY27")?;
    assert!(path.ends_with("KAM_Dashboard_FY27.xlsx"));

    let dataset = load_dataset(&path)?;
    let months = dataset.monthly_billing.as_deref().expect("monthly billing");
    assert_eq!(months[0].month, "Apr'27");
    assert!(months.iter().all(|m| m.achievement.is_none()));

    let billing = dataset.billing_totals.expect("billing totals");
    assert_eq!(billing.total_target, 300.0);
    assert_eq!(billing.total_achievement, 0.0);
    assert_eq!(billing.achievement_percentage, 0.0);

    // Pipeline left blank reads as zero; the ARR gap is the full target
    assert_eq!(dataset.pipeline_coverage.open_pipeline, 0.0);
    assert!(close(dataset.pipeline_coverage.remaining_target, 57.4));
    assert_eq!(dataset.pipeline_coverage.coverage, 0.0);

    let qbrs = dataset.quarterly_qbrs.as_deref().expect("QBRs");
    assert!(qbrs.iter().all(|q| q.achievement == 0.0 && q.percentage == 0.0));

    Ok(())
}

#[test]
fn test_missing_sheets_drop_only_their_fields() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("partial.xlsx");
    let rows = vec![
        vec![CellValue::text("On-Time Billing")],
        vec![],
        vec!["Month".into(), "Target".into(), "Achievement".into()],
        vec!["Apr'26".into(), 25.0.into(), 20.0.into()],
        vec!["May'26".into(), 25.0.into(), "n/a".into()],
        vec![],
        vec!["Jun'26".into(), "tbd".into(), 10.0.into()],
    ];
    write_workbook(&path, &[SheetSpec::new("Monthly Billing", rows)])?;

    let dataset = load_dataset(&path)?;
    let months = dataset.monthly_billing.as_deref().expect("monthly billing");
    assert_eq!(months.len(), 3);
    assert_eq!(months[1].achievement, Some(0.0));
    assert_eq!(months[2].target, 0.0);
    assert_eq!(months[2].percentage, None);

    let billing = dataset.billing_totals.expect("billing totals");
    assert_eq!(billing.total_target, 50.0);
    assert_eq!(billing.total_achievement, 30.0);

    assert!(dataset.monthly_collection.is_none());
    assert!(dataset.collection_totals.is_none());
    assert!(dataset.quarterly_arr.is_none());
    assert!(dataset.annual_metrics.arr.is_none());
    assert!(dataset.weightages.is_none());
    assert_eq!(dataset.pipeline_coverage.coverage, 0.0);

    let json = serde_json::to_value(&dataset)?;
    assert!(json.get("monthlyBilling").is_some());
    assert!(json.get("monthlyCollection").is_none());
    assert!(json.get("quarterlyARR").is_none());
    assert!(json.get("pipelineCoverage").is_some());

    Ok(())
}

#[test]
fn test_json_field_names() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_template(dir.path(), "KAM", "FY26")?;
    let json = serde_json::to_value(load_dataset(&path)?)?;

    for field in [
        "annualMetrics",
        "monthlyBilling",
        "monthlyCollection",
        "quarterlyQBRs",
        "quarterlyHeroStories",
        "quarterlyARR",
        "quarterlyServiceRev",
        "accountOwnerPerformance",
        "weightages",
        "billingTotals",
        "collectionTotals",
        "pipelineCoverage",
        "ragMetrics",
    ] {
        assert!(json.get(field).is_some(), "missing field {}", field);
    }

    assert_eq!(json["annualMetrics"]["ndr"]["targetFY"], 1.2);
    assert!(json["annualMetrics"]["serviceRev"]["achievementTillDate"].is_number());
    assert_eq!(json["accountOwnerPerformance"][0]["name"], "Ansu Jain");
    assert!(json["accountOwnerPerformance"][0]["arrAchievement"].is_number());
    assert_eq!(json["weightages"][0]["key"], "arr");
    assert!(json["monthlyBilling"][11]["achievement"].is_null());
    assert!(json["billingTotals"]["achievementPercentage"].is_number());
    assert_eq!(json["ragMetrics"][0]["status"], "red");

    Ok(())
}

#[test]
fn test_template_passes_layout_checks() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    for fy in ["FY26", "FY27"] {
        let path = write_template(dir.path(), "KAM", fy)?;
        let violations = Checker::new().check_file(&path)?;
        assert!(violations.is_empty(), "{}: {:?}", fy, violations);
    }
    Ok(())
}
