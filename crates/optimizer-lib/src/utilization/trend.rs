use crate::models::TimeSeriesPoint;
use crate::normalizer::mean;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

/// CPU utilization trend between the first and second half of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub first_half_avg: Option<f64>,
    pub second_half_avg: Option<f64>,
    /// Second half average minus first half average
    pub change: Option<f64>,
}

impl TrendAnalysis {
    fn insufficient() -> Self {
        Self {
            direction: TrendDirection::InsufficientData,
            first_half_avg: None,
            second_half_avg: None,
            change: None,
        }
    }

    pub(crate) fn detect(series: &[TimeSeriesPoint], min_points: usize, stable_delta: f64) -> Self {
        if series.len() < min_points.max(2) {
            return Self::insufficient();
        }

        let (first, second) = series.split_at(series.len() / 2);
        let first_avg = mean(first.iter().filter_map(|p| p.cpu_utilization));
        let second_avg = mean(second.iter().filter_map(|p| p.cpu_utilization));

        let (first_avg, second_avg) = match (first_avg, second_avg) {
            (Some(a), Some(b)) => (a, b),
            _ => return Self::insufficient(),
        };

        let change = second_avg - first_avg;
        // Stable only strictly inside the band
        let direction = if change.abs() < stable_delta {
            TrendDirection::Stable
        } else if change > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };

        Self {
            direction,
            first_half_avg: Some(first_avg),
            second_half_avg: Some(second_avg),
            change: Some(change),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(cpu: &[f64]) -> Vec<TimeSeriesPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        cpu.iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint {
                date: start + Duration::days(i as i64),
                cost: 5.0,
                cpu_utilization: Some(*v),
                memory_utilization: None,
            })
            .collect()
    }

    #[test]
    fn test_increasing() {
        let mut cpu = vec![0.2; 10];
        cpu.extend(vec![0.5; 10]);
        let trend = TrendAnalysis::detect(&series(&cpu), 14, 0.05);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!((trend.change.unwrap() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_decreasing() {
        let mut cpu = vec![0.6; 10];
        cpu.extend(vec![0.3; 10]);
        let trend = TrendAnalysis::detect(&series(&cpu), 14, 0.05);
        assert_eq!(trend.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_stable_within_delta() {
        let mut cpu = vec![0.40; 10];
        cpu.extend(vec![0.42; 10]);
        let trend = TrendAnalysis::detect(&series(&cpu), 14, 0.05);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_change_at_delta_is_not_stable() {
        let mut cpu = vec![0.0; 10];
        cpu.extend(vec![0.0625; 10]);
        let trend = TrendAnalysis::detect(&series(&cpu), 14, 0.0625);
        assert_eq!(trend.change, Some(0.0625));
        assert_eq!(trend.direction, TrendDirection::Increasing);

        cpu.reverse();
        let trend = TrendAnalysis::detect(&series(&cpu), 14, 0.0625);
        assert_eq!(trend.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_short_series() {
        let trend = TrendAnalysis::detect(&series(&[0.5; 10]), 14, 0.05);
        assert_eq!(trend.direction, TrendDirection::InsufficientData);
        assert!(trend.change.is_none());
    }
}
