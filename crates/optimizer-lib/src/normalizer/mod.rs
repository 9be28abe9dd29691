//! Normalization of provider cost records
//!
//! Converts provider-native records into the canonical representation and
//! derives the time-series and summary projections used downstream. Every
//! function here is pure.

mod regions;

pub use regions::{carbon_intensity, is_canonical, strip_separators, CANONICAL_REGIONS};

use crate::models::{CostRecord, NormalizedResourceCost, Provider, TimeSeriesPoint};
use std::collections::BTreeMap;

/// Canonicalize a provider region name
///
/// Already-canonical regions are returned unchanged; unmapped names fall
/// back to their lowercased, separator-stripped form. Never fails.
pub fn canonical_region(provider: Provider, region: &str) -> String {
    let trimmed = region.trim().to_ascii_lowercase();
    if is_canonical(&trimmed) {
        return trimmed;
    }
    match regions::lookup(provider, &trimmed) {
        Some(canonical) => canonical.to_string(),
        None => strip_separators(&trimmed),
    }
}

/// Normalize a single cost record
///
/// Idempotent: normalizing a normalized record returns it unchanged.
pub fn normalize(record: CostRecord) -> CostRecord {
    let region = canonical_region(record.provider, &record.region);
    CostRecord {
        region,
        avg_cpu_utilization: clamp_ratio(record.avg_cpu_utilization),
        avg_memory_utilization: clamp_ratio(record.avg_memory_utilization),
        daily_cost: if record.daily_cost.is_finite() {
            record.daily_cost.max(0.0)
        } else {
            0.0
        },
        ..record
    }
}

fn clamp_ratio(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan()).map(|v| v.clamp(0.0, 1.0))
}

/// Project records into an ascending, date-unique time series
pub fn to_time_series(records: &[CostRecord]) -> Vec<TimeSeriesPoint> {
    let mut by_date: BTreeMap<_, TimeSeriesPoint> = BTreeMap::new();
    for record in records {
        by_date.entry(record.date).or_insert_with(|| TimeSeriesPoint {
            date: record.date,
            cost: record.daily_cost,
            cpu_utilization: record.avg_cpu_utilization,
            memory_utilization: record.avg_memory_utilization,
        });
    }
    by_date.into_values().collect()
}

/// Summarize a resource's records over the window they cover
///
/// Configuration fields come from the most recent record.
pub fn summarize(records: &[CostRecord]) -> Option<NormalizedResourceCost> {
    let latest = records.iter().max_by_key(|r| r.date)?;
    let period_start = records.iter().map(|r| r.date).min()?;

    let total_cost: f64 = records.iter().map(|r| r.daily_cost).sum();
    let count = records.len();

    Some(NormalizedResourceCost {
        tenant: latest.tenant.clone(),
        provider: latest.provider,
        resource_id: latest.resource_id.clone(),
        resource_name: latest.resource_name.clone(),
        resource_type: latest.resource_type,
        sku: latest.sku.clone(),
        canonical_region: canonical_region(latest.provider, &latest.region),
        vcpu: latest.vcpu,
        memory_gb: latest.memory_gb,
        storage_gb: latest.storage_gb,
        total_cost,
        avg_daily_cost: total_cost / count as f64,
        avg_cpu_utilization: mean(records.iter().filter_map(|r| r.avg_cpu_utilization)),
        avg_memory_utilization: mean(records.iter().filter_map(|r| r.avg_memory_utilization)),
        data_point_count: count,
        period_start,
        period_end: latest.date,
    })
}

/// Mean of an iterator, `None` when empty
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
