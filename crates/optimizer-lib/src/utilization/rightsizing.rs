//! Rightsizing guidance derived from a classification

use super::{Classification, UtilizationState};
use serde::{Deserialize, Serialize};

/// Days used to turn daily cost into monthly cost
const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RightsizingAction {
    DeleteOrStop,
    Downsize,
    Upsize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsizingResult {
    pub action_recommended: bool,
    pub action: Option<RightsizingAction>,
    pub current_vcpu: Option<u32>,
    pub recommended_vcpu: Option<u32>,
    pub current_memory_gb: Option<f64>,
    pub recommended_memory_gb: Option<f64>,
    /// Fraction of current capacity kept by a downsize
    pub reduction_factor: Option<f64>,
    /// Upsizing reports zero: it costs more and is not a savings action
    pub estimated_monthly_savings: f64,
    pub reason: String,
}

impl RightsizingResult {
    fn no_action(
        current_vcpu: Option<u32>,
        current_memory_gb: Option<f64>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action_recommended: false,
            action: None,
            current_vcpu,
            recommended_vcpu: current_vcpu,
            current_memory_gb,
            recommended_memory_gb: current_memory_gb,
            reduction_factor: None,
            estimated_monthly_savings: 0.0,
            reason: reason.into(),
        }
    }

    pub(crate) fn analyze(
        classification: &Classification,
        avg_daily_cost: f64,
        current_vcpu: Option<u32>,
        current_memory_gb: Option<f64>,
        min_reduction_factor: f64,
    ) -> Self {
        let monthly_cost = avg_daily_cost.max(0.0) * DAYS_PER_MONTH;

        match classification.state {
            UtilizationState::Optimized => {
                Self::no_action(current_vcpu, current_memory_gb, "Resource is right-sized")
            }
            UtilizationState::InsufficientData => Self::no_action(
                current_vcpu,
                current_memory_gb,
                "Not enough utilization data to size the resource",
            ),
            UtilizationState::Idle => Self {
                action_recommended: true,
                action: Some(RightsizingAction::DeleteOrStop),
                current_vcpu,
                recommended_vcpu: None,
                current_memory_gb,
                recommended_memory_gb: None,
                reduction_factor: None,
                estimated_monthly_savings: monthly_cost,
                reason: format!("Resource is idle: {}", classification.reason),
            },
            UtilizationState::Underutilized => {
                let avg_cpu = classification.stats.avg_cpu.unwrap_or(0.0);
                let factor = (avg_cpu * 2.0).max(min_reduction_factor).min(1.0);
                Self {
                    action_recommended: true,
                    action: Some(RightsizingAction::Downsize),
                    current_vcpu,
                    recommended_vcpu: current_vcpu
                        .map(|v| ((v as f64 * factor).ceil() as u32).max(1)),
                    current_memory_gb,
                    recommended_memory_gb: current_memory_gb.map(|m| (m * factor).max(1.0)),
                    reduction_factor: Some(factor),
                    estimated_monthly_savings: monthly_cost * (1.0 - factor),
                    reason: format!(
                        "Resource is underutilized; keep {:.0}% of capacity",
                        factor * 100.0
                    ),
                }
            }
            UtilizationState::Overutilized => Self {
                action_recommended: true,
                action: Some(RightsizingAction::Upsize),
                current_vcpu,
                recommended_vcpu: current_vcpu.map(|v| v.saturating_mul(2)),
                current_memory_gb,
                recommended_memory_gb: current_memory_gb.map(|m| m * 2.0),
                reduction_factor: None,
                estimated_monthly_savings: 0.0,
                reason: "Resource is overutilized; double capacity".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilization::UtilizationStats;

    fn classification(state: UtilizationState, avg_cpu: Option<f64>) -> Classification {
        Classification {
            state,
            confidence: 0.9,
            stats: UtilizationStats {
                data_points: 30,
                avg_cpu,
                ..Default::default()
            },
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_downsize_scenario() {
        let c = classification(UtilizationState::Underutilized, Some(0.15));
        let result = RightsizingResult::analyze(&c, 10.0, Some(4), Some(16.0), 0.5);

        assert!(result.action_recommended);
        assert_eq!(result.action, Some(RightsizingAction::Downsize));
        assert_eq!(result.reduction_factor, Some(0.5));
        assert_eq!(result.recommended_vcpu, Some(2));
        assert_eq!(result.recommended_memory_gb, Some(8.0));
        assert!((result.estimated_monthly_savings - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_downsize_factor_tracks_utilization() {
        let c = classification(UtilizationState::Underutilized, Some(0.18));
        let result = RightsizingResult::analyze(&c, 10.0, Some(3), Some(1.0), 0.25);

        let factor = result.reduction_factor.unwrap();
        assert!((factor - 0.36).abs() < 1e-9);
        // ceil(3 * 0.36) = 2, memory floored at 1 GB
        assert_eq!(result.recommended_vcpu, Some(2));
        assert_eq!(result.recommended_memory_gb, Some(1.0));
        assert!((result.estimated_monthly_savings - 192.0).abs() < 1e-9);
    }

    #[test]
    fn test_idle_recommends_delete() {
        let c = classification(UtilizationState::Idle, Some(0.01));
        let result = RightsizingResult::analyze(&c, 12.0, Some(2), Some(8.0), 0.5);
        assert_eq!(result.action, Some(RightsizingAction::DeleteOrStop));
        assert!((result.estimated_monthly_savings - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_overutilized_upsizes_without_savings() {
        let c = classification(UtilizationState::Overutilized, Some(0.92));
        let result = RightsizingResult::analyze(&c, 12.0, Some(2), Some(8.0), 0.5);
        assert_eq!(result.action, Some(RightsizingAction::Upsize));
        assert_eq!(result.recommended_vcpu, Some(4));
        assert_eq!(result.recommended_memory_gb, Some(16.0));
        assert_eq!(result.estimated_monthly_savings, 0.0);
    }

    #[test]
    fn test_no_action_states() {
        for state in [UtilizationState::Optimized, UtilizationState::InsufficientData] {
            let c = classification(state, Some(0.5));
            let result = RightsizingResult::analyze(&c, 12.0, Some(2), Some(8.0), 0.5);
            assert!(!result.action_recommended);
            assert!(result.action.is_none());
            assert_eq!(result.estimated_monthly_savings, 0.0);
        }
    }

    #[test]
    fn test_missing_sizes_still_estimate_savings() {
        let c = classification(UtilizationState::Underutilized, Some(0.1));
        let result = RightsizingResult::analyze(&c, 10.0, None, None, 0.5);
        assert!(result.recommended_vcpu.is_none());
        assert!((result.estimated_monthly_savings - 150.0).abs() < 1e-9);
    }
}
