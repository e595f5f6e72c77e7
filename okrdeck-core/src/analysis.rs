//! Illustrative trend figures for the dashboard: regression, correlation,
//! moving averages and a naive year-end forecast.

use crate::dataset::MonthlyMetric;
use serde::Serialize;
use std::fmt;

/// Least-squares line over points `(i, values[i])`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
}

impl Trend {
    /// Value of the line at position `x`
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

pub fn linear_regression(values: &[f64]) -> Trend {
    let n = values.len() as f64;
    if values.is_empty() {
        return Trend {
            slope: 0.0,
            intercept: 0.0,
        };
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (x, y) in values.iter().enumerate() {
        let x = x as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denominator = n * sum_x2 - sum_x * sum_x;
    // A single point has no slope
    let slope = if denominator == 0.0 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denominator
    };

    Trend {
        slope,
        intercept: (sum_y - slope * sum_x) / n,
    }
}

/// Pearson correlation over the common prefix of `x` and `y`
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let len = x.len().min(y.len());
    if len < 2 {
        return 0.0;
    }
    let n = len as f64;

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y).take(len) {
        sum_x += a;
        sum_y += b;
        sum_xy += a * b;
        sum_x2 += a * a;
        sum_y2 += b * b;
    }

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 || denominator.is_nan() {
        0.0
    } else {
        numerator / denominator
    }
}

/// Trailing moving average; positions before a full window are `None`
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                let sum: f64 = values[i + 1 - window..=i].iter().sum();
                Some(sum / window as f64)
            }
        })
        .collect()
}

/// Running total of reported achievements; unreported months add nothing
pub fn cumulative_achievement(months: &[MonthlyMetric]) -> Vec<f64> {
    months
        .iter()
        .scan(0.0, |total, m| {
            *total += m.achievement.unwrap_or(0.0);
            Some(*total)
        })
        .collect()
}

/// Year-end projection: reported total plus the reported monthly average for
/// every remaining month
pub fn predict_year_end(months: &[MonthlyMetric], total_months: usize) -> f64 {
    let reported: Vec<f64> = months.iter().filter_map(|m| m.achievement).collect();
    if reported.is_empty() {
        return 0.0;
    }

    let total: f64 = reported.iter().sum();
    let average = total / reported.len() as f64;
    let remaining = total_months.saturating_sub(reported.len()) as f64;

    total + average * remaining
}

/// Traffic-light reading of an achievement ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AchievementStatus {
    OnTrack,
    AtRisk,
    Behind,
    NoData,
}

impl AchievementStatus {
    pub fn from_percentage(percentage: Option<f64>) -> Self {
        match percentage {
            None => AchievementStatus::NoData,
            Some(p) if p >= 1.0 => AchievementStatus::OnTrack,
            Some(p) if p >= 0.8 => AchievementStatus::AtRisk,
            Some(_) => AchievementStatus::Behind,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementStatus::OnTrack => "On Track",
            AchievementStatus::AtRisk => "At Risk",
            AchievementStatus::Behind => "Behind",
            AchievementStatus::NoData => "No Data",
        }
    }
}

impl fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_linear_regression_exact_line() {
        let trend = linear_regression(&[1.0, 3.0, 5.0, 7.0]);
        assert!((trend.slope - 2.0).abs() < EPS);
        assert!((trend.intercept - 1.0).abs() < EPS);
        assert!((trend.at(4.0) - 9.0).abs() < EPS);
    }

    #[test]
    fn test_linear_regression_degenerate_inputs() {
        assert_eq!(linear_regression(&[]), Trend { slope: 0.0, intercept: 0.0 });
        let single = linear_regression(&[42.0]);
        assert_eq!(single.slope, 0.0);
        assert_eq!(single.intercept, 42.0);
    }

    #[test]
    fn test_pearson_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson_correlation(&x, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < EPS);
        assert!((pearson_correlation(&x, &[8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < EPS);
        assert_eq!(pearson_correlation(&x, &[5.0, 5.0, 5.0, 5.0]), 0.0);
        assert_eq!(pearson_correlation(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_moving_average_window() {
        let avg = moving_average(&[3.0, 6.0, 9.0, 12.0], 3);
        assert_eq!(avg, vec![None, None, Some(6.0), Some(9.0)]);
        assert_eq!(moving_average(&[1.0], 0), vec![None]);
    }

    #[test]
    fn test_cumulative_and_forecast() {
        let months = vec![
            MonthlyMetric::new("Apr'26", 25.0, Some(10.0)),
            MonthlyMetric::new("May'26", 25.0, None),
            MonthlyMetric::new("Jun'26", 25.0, Some(20.0)),
        ];
        assert_eq!(cumulative_achievement(&months), vec![10.0, 10.0, 30.0]);
        // 30 reported over 2 months, 10 months to go at 15/month
        assert_eq!(predict_year_end(&months, 12), 180.0);
        assert_eq!(predict_year_end(&[], 12), 0.0);
    }

    #[test]
    fn test_achievement_status_thresholds() {
        assert_eq!(AchievementStatus::from_percentage(Some(1.0)), AchievementStatus::OnTrack);
        assert_eq!(AchievementStatus::from_percentage(Some(0.8)), AchievementStatus::AtRisk);
        assert_eq!(AchievementStatus::from_percentage(Some(0.62)), AchievementStatus::Behind);
        assert_eq!(AchievementStatus::from_percentage(None), AchievementStatus::NoData);
    }
}
