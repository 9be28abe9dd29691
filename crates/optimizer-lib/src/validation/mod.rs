//! Post-implementation savings validation
//!
//! Compares a resource's daily cost before an implemented recommendation
//! with its cost after a stabilization period and classifies how much of
//! the expected saving was realized.

mod scheduler;
mod validator;

pub use scheduler::ValidationScheduler;
pub use validator::SavingsValidator;

use crate::models::{RecommendationAction, ValidationStatus};
use crate::normalizer::mean;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Days of baseline before implementation
    pub before_days: i64,
    /// Days after implementation ignored while the change settles
    pub stabilization_days: i64,
    /// Fewer after-window days than this defers the item
    pub min_after_days: i64,
    pub validated_ratio: f64,
    pub partial_ratio: f64,
    pub days_per_month: f64,
    pub interval_hours: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            before_days: 14,
            stabilization_days: 7,
            min_after_days: 7,
            validated_ratio: 0.5,
            partial_ratio: 0.25,
            days_per_month: 30.0,
            interval_hours: 24,
        }
    }
}

impl ValidationConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_hours.max(1) * 3600)
    }
}

/// Inclusive date windows compared for one implemented recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationWindows {
    pub before_start: NaiveDate,
    pub before_end: NaiveDate,
    pub after_start: NaiveDate,
    pub after_end: NaiveDate,
}

impl ValidationWindows {
    /// Windows for a change made on `implemented` and validated on `today`
    ///
    /// The after window ends yesterday; today's cost is still accruing.
    pub fn new(implemented: NaiveDate, today: NaiveDate, config: &ValidationConfig) -> Self {
        Self {
            before_start: implemented - Duration::days(config.before_days),
            before_end: implemented - Duration::days(1),
            after_start: implemented + Duration::days(config.stabilization_days),
            after_end: today - Duration::days(1),
        }
    }

    pub fn after_days(&self) -> i64 {
        ((self.after_end - self.after_start).num_days() + 1).max(0)
    }
}

/// Outcome of comparing the two windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: ValidationStatus,
    pub cost_before_daily: Option<f64>,
    pub cost_after_daily: Option<f64>,
    pub actual_monthly_savings: Option<f64>,
    pub ratio: Option<f64>,
    pub note: String,
}

/// Classify realized savings from before/after daily costs
pub fn evaluate(
    action: RecommendationAction,
    expected_monthly_savings: f64,
    before: &[f64],
    after: &[f64],
    config: &ValidationConfig,
) -> Evaluation {
    let before_avg = mean(before.iter().copied());
    let after_avg = mean(after.iter().copied());

    let after_avg = match after_avg {
        Some(avg) => avg,
        // A deleted resource stops reporting cost
        None if action.is_deletion() => {
            return Evaluation {
                status: ValidationStatus::Validated,
                cost_before_daily: before_avg,
                cost_after_daily: Some(0.0),
                actual_monthly_savings: Some(expected_monthly_savings),
                ratio: Some(1.0),
                note: format!(
                    "Resource removed; expected savings of ${:.2}/mo realized (100.0%)",
                    expected_monthly_savings
                ),
            };
        }
        None => {
            return Evaluation {
                status: ValidationStatus::Failed,
                cost_before_daily: before_avg,
                cost_after_daily: None,
                actual_monthly_savings: None,
                ratio: None,
                note: "No cost data after implementation".to_string(),
            };
        }
    };

    let before_avg = match before_avg {
        Some(avg) => avg,
        None => {
            return Evaluation {
                status: ValidationStatus::Failed,
                cost_before_daily: None,
                cost_after_daily: Some(after_avg),
                actual_monthly_savings: None,
                ratio: None,
                note: "No baseline cost data before implementation".to_string(),
            };
        }
    };

    let actual = (before_avg - after_avg) * config.days_per_month;
    let ratio = if expected_monthly_savings > 0.0 {
        actual / expected_monthly_savings
    } else if actual >= 0.0 {
        1.0
    } else {
        0.0
    };

    let status = if ratio >= config.validated_ratio {
        ValidationStatus::Validated
    } else if ratio >= config.partial_ratio {
        ValidationStatus::Partial
    } else {
        ValidationStatus::Failed
    };

    let daily_change = if before_avg > 0.0 {
        (after_avg - before_avg) / before_avg * 100.0
    } else {
        0.0
    };

    Evaluation {
        status,
        cost_before_daily: Some(before_avg),
        cost_after_daily: Some(after_avg),
        actual_monthly_savings: Some(actual),
        ratio: Some(ratio),
        note: format!(
            "Realized ${:.2}/mo of ${:.2}/mo expected ({:.1}%); daily cost ${:.2} -> ${:.2} ({:+.1}%)",
            actual,
            expected_monthly_savings,
            ratio * 100.0,
            before_avg,
            after_avg,
            daily_change
        ),
    }
}

/// Counts from one validation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRunSummary {
    pub candidates: usize,
    pub validated: usize,
    pub partial: usize,
    pub failed: usize,
    /// Not enough post-implementation data yet; retried next run
    pub deferred: usize,
    pub errors: usize,
}

impl ValidationRunSummary {
    fn record(&mut self, status: ValidationStatus) {
        match status {
            ValidationStatus::Validated => self.validated += 1,
            ValidationStatus::Partial => self.partial += 1,
            ValidationStatus::Failed => self.failed += 1,
            ValidationStatus::Pending => self.deferred += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(cost: f64, n: usize) -> Vec<f64> {
        vec![cost; n]
    }

    #[test]
    fn test_realized_savings_validated() {
        let config = ValidationConfig::default();
        let result = evaluate(
            RecommendationAction::DownsizeInstance,
            100.0,
            &days(10.0, 14),
            &days(8.0, 10),
            &config,
        );
        assert_eq!(result.status, ValidationStatus::Validated);
        assert_eq!(result.actual_monthly_savings, Some(60.0));
        assert_eq!(result.ratio, Some(0.6));
        assert!(result.note.contains("60.0%"), "{}", result.note);
        assert!(result.note.contains("-20.0%"), "{}", result.note);
    }

    #[test]
    fn test_ratio_bands() {
        let config = ValidationConfig::default();
        let status = |after: f64| {
            evaluate(
                RecommendationAction::DownsizeInstance,
                120.0,
                &days(10.0, 14),
                &days(after, 7),
                &config,
            )
            .status
        };
        // savings = (10 - after) * 30, ratio = savings / 120
        assert_eq!(status(8.0), ValidationStatus::Validated);
        assert_eq!(status(9.0), ValidationStatus::Partial);
        assert_eq!(status(9.5), ValidationStatus::Failed);
        assert_eq!(status(11.0), ValidationStatus::Failed);
    }

    #[test]
    fn test_deletion_without_after_data() {
        let result = evaluate(
            RecommendationAction::DeleteResource,
            300.0,
            &days(10.0, 14),
            &[],
            &ValidationConfig::default(),
        );
        assert_eq!(result.status, ValidationStatus::Validated);
        assert_eq!(result.actual_monthly_savings, Some(300.0));
        assert_eq!(result.cost_after_daily, Some(0.0));
    }

    #[test]
    fn test_missing_data_fails() {
        let config = ValidationConfig::default();
        let no_after = evaluate(
            RecommendationAction::DownsizeInstance,
            100.0,
            &days(10.0, 14),
            &[],
            &config,
        );
        assert_eq!(no_after.status, ValidationStatus::Failed);
        assert!(no_after.note.contains("No cost data"));

        let no_before = evaluate(
            RecommendationAction::DownsizeInstance,
            100.0,
            &[],
            &days(8.0, 7),
            &config,
        );
        assert_eq!(no_before.status, ValidationStatus::Failed);
        assert!(no_before.note.contains("baseline"));
    }

    #[test]
    fn test_zero_expected_savings() {
        let config = ValidationConfig::default();
        let flat = evaluate(
            RecommendationAction::ScheduleShutdown,
            0.0,
            &days(10.0, 14),
            &days(10.0, 7),
            &config,
        );
        assert_eq!(flat.ratio, Some(1.0));
        assert_eq!(flat.status, ValidationStatus::Validated);

        let worse = evaluate(
            RecommendationAction::ScheduleShutdown,
            0.0,
            &days(10.0, 14),
            &days(12.0, 7),
            &config,
        );
        assert_eq!(worse.ratio, Some(0.0));
        assert_eq!(worse.status, ValidationStatus::Failed);
    }

    #[test]
    fn test_windows() {
        let config = ValidationConfig::default();
        let implemented = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let windows = ValidationWindows::new(implemented, implemented + Duration::days(30), &config);
        assert_eq!(windows.before_start, NaiveDate::from_ymd_opt(2024, 4, 17).unwrap());
        assert_eq!(windows.before_end, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
        assert_eq!(windows.after_start, NaiveDate::from_ymd_opt(2024, 5, 8).unwrap());
        assert_eq!(windows.after_end, NaiveDate::from_ymd_opt(2024, 5, 30).unwrap());
        assert_eq!(windows.after_days(), 23);

        let early = ValidationWindows::new(implemented, implemented + Duration::days(10), &config);
        assert_eq!(early.after_days(), 3);
        let same_day = ValidationWindows::new(implemented, implemented, &config);
        assert_eq!(same_day.after_days(), 0);
    }
}
