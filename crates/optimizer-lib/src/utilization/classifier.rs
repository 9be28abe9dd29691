//! Utilization state classification

use super::{
    Classification, ClassifierConfig, RightsizingResult, TrendAnalysis, UtilizationState,
    UtilizationStats,
};
use crate::models::TimeSeriesPoint;
use crate::normalizer::mean;

pub struct UtilizationClassifier {
    config: ClassifierConfig,
}

impl UtilizationClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify the utilization regime of a series
    ///
    /// Rules are evaluated in order and the first match wins.
    pub fn classify(&self, series: &[TimeSeriesPoint]) -> Classification {
        let c = &self.config;
        let stats = compute_stats(series, c.idle_threshold);
        let n = series.len();

        if n < c.min_data_points {
            return Classification::insufficient(
                stats,
                format!("Insufficient data: {} points, need {}", n, c.min_data_points),
            );
        }

        if stats.max_consecutive_idle_days >= c.idle_days_threshold {
            let reason = format!(
                "CPU below {:.0}% for {} consecutive days",
                c.idle_threshold * 100.0,
                stats.max_consecutive_idle_days
            );
            return self.classified(UtilizationState::Idle, stats, reason);
        }

        let avg_cpu = match stats.avg_cpu {
            Some(avg) => avg,
            None => return Classification::insufficient(stats, "No CPU utilization samples"),
        };

        let (state, reason) = if avg_cpu < c.idle_threshold {
            (
                UtilizationState::Idle,
                format!("Average CPU {:.1}% below idle threshold", avg_cpu * 100.0),
            )
        } else if avg_cpu < c.underutilized_threshold {
            (
                UtilizationState::Underutilized,
                format!(
                    "Average CPU {:.1}% below {:.0}%",
                    avg_cpu * 100.0,
                    c.underutilized_threshold * 100.0
                ),
            )
        } else if avg_cpu > c.overutilized_threshold {
            (
                UtilizationState::Overutilized,
                format!(
                    "Average CPU {:.1}% above {:.0}%",
                    avg_cpu * 100.0,
                    c.overutilized_threshold * 100.0
                ),
            )
        } else {
            (
                UtilizationState::Optimized,
                format!("Average CPU {:.1}% within target range", avg_cpu * 100.0),
            )
        };

        self.classified(state, stats, reason)
    }

    fn classified(
        &self,
        state: UtilizationState,
        stats: UtilizationStats,
        reason: String,
    ) -> Classification {
        let confidence = self.confidence(stats.data_points, stats.avg_cpu);
        Classification {
            state,
            confidence,
            stats,
            reason,
        }
    }

    /// Blend of history length and how far the average sits from the boundaries
    pub fn confidence(&self, data_points: usize, avg_cpu: Option<f64>) -> f64 {
        let c = &self.config;
        let data = (data_points as f64 / c.full_confidence_days).min(1.0);
        let clarity = match avg_cpu {
            Some(avg) if avg < c.clear_low_cpu || avg > c.clear_high_cpu => c.clear_clarity,
            Some(avg) if avg < c.fairly_clear_low_cpu || avg > c.fairly_clear_high_cpu => {
                c.fairly_clear_clarity
            }
            _ => c.ambiguous_clarity,
        };
        c.data_confidence_weight * data + c.clarity_confidence_weight * clarity
    }

    /// Rightsizing guidance for a classified resource
    pub fn analyze_rightsizing(
        &self,
        classification: &Classification,
        avg_daily_cost: f64,
        current_vcpu: Option<u32>,
        current_memory_gb: Option<f64>,
    ) -> RightsizingResult {
        RightsizingResult::analyze(
            classification,
            avg_daily_cost,
            current_vcpu,
            current_memory_gb,
            self.config.min_reduction_factor,
        )
    }

    /// Compare CPU utilization between the two halves of the series
    pub fn detect_trend(&self, series: &[TimeSeriesPoint]) -> TrendAnalysis {
        TrendAnalysis::detect(
            series,
            self.config.trend_min_points,
            self.config.trend_stable_delta,
        )
    }
}

impl Default for UtilizationClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

/// Compute utilization statistics, ignoring missing samples
///
/// A missing CPU sample ends a run of idle days.
pub fn compute_stats(series: &[TimeSeriesPoint], idle_threshold: f64) -> UtilizationStats {
    let cpu = || series.iter().filter_map(|p| p.cpu_utilization);
    let memory = || series.iter().filter_map(|p| p.memory_utilization);

    let mut longest = 0;
    let mut current = 0;
    for point in series {
        match point.cpu_utilization {
            Some(v) if v < idle_threshold => {
                current += 1;
                longest = longest.max(current);
            }
            _ => current = 0,
        }
    }

    UtilizationStats {
        data_points: series.len(),
        avg_cpu: mean(cpu()),
        max_cpu: cpu().reduce(f64::max),
        avg_memory: mean(memory()),
        max_memory: memory().reduce(f64::max),
        max_consecutive_idle_days: longest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(cpu: &[Option<f64>]) -> Vec<TimeSeriesPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        cpu.iter()
            .enumerate()
            .map(|(i, value)| TimeSeriesPoint {
                date: start + Duration::days(i as i64),
                cost: 10.0,
                cpu_utilization: *value,
                memory_utilization: value.map(|v| v / 2.0),
            })
            .collect()
    }

    fn constant(n: usize, cpu: f64) -> Vec<TimeSeriesPoint> {
        series(&vec![Some(cpu); n])
    }

    #[test]
    fn test_insufficient_data_below_seven_points() {
        let classifier = UtilizationClassifier::default();
        for n in 0..7 {
            let result = classifier.classify(&constant(n, 0.5));
            assert_eq!(result.state, UtilizationState::InsufficientData);
            assert_eq!(result.confidence, 0.0);
        }
    }

    #[test]
    fn test_underutilized_scenario() {
        let result = UtilizationClassifier::default().classify(&constant(30, 0.15));
        assert_eq!(result.state, UtilizationState::Underutilized);
        assert!((result.confidence - (0.4 + 0.6 * 0.85)).abs() < 1e-9);
    }

    #[test]
    fn test_idle_run_overrides_average() {
        // 10 idle days in the middle of otherwise busy usage
        let mut cpu = vec![Some(0.6); 30];
        for value in cpu.iter_mut().skip(10).take(10) {
            *value = Some(0.01);
        }
        let result = UtilizationClassifier::default().classify(&series(&cpu));

        assert_eq!(result.stats.max_consecutive_idle_days, 10);
        assert_eq!(result.state, UtilizationState::Idle);
    }

    #[test]
    fn test_missing_sample_breaks_idle_run() {
        let mut cpu = vec![Some(0.01); 12];
        cpu[6] = None;
        let stats = compute_stats(&series(&cpu), 0.05);
        assert_eq!(stats.max_consecutive_idle_days, 6);
    }

    #[test]
    fn test_idle_by_average() {
        // Alternating samples keep every idle run short
        let cpu: Vec<Option<f64>> = (0..20)
            .map(|i| if i % 2 == 0 { Some(0.01) } else { Some(0.06) })
            .collect();
        let result = UtilizationClassifier::default().classify(&series(&cpu));
        assert_eq!(result.state, UtilizationState::Idle);
    }

    #[test]
    fn test_no_cpu_samples() {
        let result = UtilizationClassifier::default().classify(&series(&vec![None; 14]));
        assert_eq!(result.state, UtilizationState::InsufficientData);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_optimized_and_overutilized() {
        let classifier = UtilizationClassifier::default();
        assert_eq!(
            classifier.classify(&constant(30, 0.5)).state,
            UtilizationState::Optimized
        );
        let over = classifier.classify(&constant(30, 0.95));
        assert_eq!(over.state, UtilizationState::Overutilized);
        assert!((over.confidence - (0.4 + 0.6 * 0.95)).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_scales_with_history() {
        let classifier = UtilizationClassifier::default();
        let short = classifier.classify(&constant(15, 0.5));
        let long = classifier.classify(&constant(60, 0.5));
        assert!((short.confidence - (0.4 * 0.5 + 0.6 * 0.7)).abs() < 1e-9);
        assert!((long.confidence - (0.4 + 0.6 * 0.7)).abs() < 1e-9);
    }

    #[test]
    fn test_stats_ignore_missing() {
        let stats = compute_stats(&series(&[Some(0.2), None, Some(0.4)]), 0.05);
        assert!((stats.avg_cpu.unwrap() - 0.3).abs() < 1e-9);
        assert_eq!(stats.max_cpu, Some(0.4));
        assert!((stats.avg_memory.unwrap() - 0.15).abs() < 1e-9);
        assert_eq!(stats.max_memory, Some(0.2));
    }

    #[test]
    fn test_clarity_bands_from_config() {
        let classifier = UtilizationClassifier::new(ClassifierConfig {
            clear_low_cpu: 0.3,
            clear_clarity: 1.0,
            ..ClassifierConfig::default()
        });
        assert!((classifier.confidence(30, Some(0.25)) - 1.0).abs() < 1e-9);
        assert!((classifier.confidence(30, Some(0.5)) - (0.4 + 0.6 * 0.7)).abs() < 1e-9);
    }
}
