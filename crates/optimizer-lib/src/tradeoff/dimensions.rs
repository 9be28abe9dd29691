//! Per-dimension scoring functions

use super::{CurrentResource, DimensionScore, TradeoffConfig};
use crate::models::{DimensionKind, Provider, ResourceAlternative, ResourceType};
use crate::normalizer::carbon_intensity;

/// SLA tier assumed for families missing from the table
const DEFAULT_SLA_TIER: u8 = 2;

/// (provider, sku family, tier); higher is more available
const SLA_TIERS: &[(Provider, &str, u8)] = &[
    (Provider::Aws, "t2", 1),
    (Provider::Aws, "t3", 1),
    (Provider::Aws, "t3a", 1),
    (Provider::Aws, "t4g", 1),
    (Provider::Aws, "m5", 3),
    (Provider::Aws, "m6i", 3),
    (Provider::Aws, "m6g", 3),
    (Provider::Aws, "c5", 3),
    (Provider::Aws, "c6i", 3),
    (Provider::Aws, "r5", 3),
    (Provider::Aws, "r6i", 3),
    (Provider::Azure, "b", 1),
    (Provider::Azure, "a", 1),
    (Provider::Azure, "d", 3),
    (Provider::Azure, "e", 3),
    (Provider::Azure, "f", 3),
    (Provider::Gcp, "f1", 1),
    (Provider::Gcp, "g1", 1),
    (Provider::Gcp, "e2", 2),
    (Provider::Gcp, "n1", 2),
    (Provider::Gcp, "n2", 3),
    (Provider::Gcp, "n2d", 3),
    (Provider::Gcp, "c2", 3),
];

/// Database engines that only exist on one cloud
const PROPRIETARY_DATABASE_MARKERS: &[&str] = &[
    "aurora", "dynamodb", "redshift", "cosmos", "synapse", "spanner", "bigtable", "firestore",
    "bigquery",
];

/// Everything a scorer may look at
pub struct ScoringInput<'a> {
    pub current: &'a CurrentResource,
    pub alternative: &'a ResourceAlternative,
    pub alternative_hourly: Option<f64>,
    pub config: &'a TradeoffConfig,
}

impl ScoringInput<'_> {
    /// Identity of the values a memoized score was computed from
    ///
    /// Alternatives are shared across regions and resources, so a stored
    /// score is only reusable when this matches.
    pub fn fingerprint(&self) -> String {
        fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
        }
        let current = self.current;
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            current.provider,
            current.resource_type,
            current.sku.to_lowercase(),
            current.region,
            opt(current.vcpu),
            opt(current.memory_gb),
            opt(current.hourly_price),
            opt(self.alternative_hourly),
        )
    }
}

/// Instance family of a SKU, lowercased
///
/// `m5.xlarge` and `db.r5.large` give `m5`/`r5`, `Standard_D4s_v3` gives
/// `d`, `n2-standard-4` gives `n2`.
pub fn sku_family(provider: Provider, sku: &str) -> String {
    let sku = sku.trim().to_ascii_lowercase();
    match provider {
        Provider::Aws => {
            let rest = sku.strip_prefix("db.").unwrap_or(&sku);
            rest.split('.').next().unwrap_or(rest).to_string()
        }
        Provider::Azure => {
            let rest = sku.strip_prefix("standard_").unwrap_or(&sku);
            rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect()
        }
        Provider::Gcp => sku.split('-').next().unwrap_or(&sku).to_string(),
    }
}

pub fn sla_tier(provider: Provider, family: &str) -> u8 {
    SLA_TIERS
        .iter()
        .find(|(p, f, _)| *p == provider && f.eq_ignore_ascii_case(family))
        .map(|(_, _, tier)| *tier)
        .unwrap_or(DEFAULT_SLA_TIER)
}

fn alternative_family(alt: &ResourceAlternative) -> String {
    if alt.sku_family.trim().is_empty() {
        sku_family(alt.alternative_provider, &alt.alternative_sku)
    } else {
        alt.sku_family.trim().to_ascii_lowercase()
    }
}

pub fn score_dimension(kind: DimensionKind, input: &ScoringInput<'_>) -> DimensionScore {
    match kind {
        DimensionKind::Cost => cost(input),
        DimensionKind::Performance => performance(input),
        DimensionKind::Availability => availability(input),
        DimensionKind::MigrationEffort => migration_effort(input),
        DimensionKind::VendorLockIn => vendor_lock_in(input),
        DimensionKind::EnvironmentalImpact => environmental_impact(input),
    }
}

fn cost(input: &ScoringInput<'_>) -> DimensionScore {
    let hours = input.config.hours_per_month;
    let (current, alternative) = match (input.current.hourly_price, input.alternative_hourly) {
        (Some(c), Some(a)) if c > 0.0 && a >= 0.0 => (c * hours, a * hours),
        _ => return DimensionScore::unknown("Pricing unavailable for one of the SKUs"),
    };

    let savings_pct = (current - alternative) / current;
    DimensionScore {
        score: (0.5 + 0.5 * savings_pct).clamp(0.0, 1.0),
        explanation: if savings_pct >= 0.0 {
            format!("{:.0}% cheaper per month", savings_pct * 100.0)
        } else {
            format!("{:.0}% more expensive per month", -savings_pct * 100.0)
        },
        current_value: format!("${:.2}/mo", current),
        alternative_value: format!("${:.2}/mo", alternative),
        confidence: 0.9,
    }
}

fn performance(input: &ScoringInput<'_>) -> DimensionScore {
    let alt = input.alternative;
    let (vcpu, memory) = match (input.current.vcpu, input.current.memory_gb) {
        (Some(v), Some(m)) if v > 0 && m > 0.0 => (v as f64, m),
        _ => return DimensionScore::unknown("Current resource size unknown"),
    };

    let vcpu_ratio = alt.vcpu as f64 / vcpu;
    let memory_ratio = alt.memory_gb / memory;
    let combined = 0.6 * vcpu_ratio + 0.4 * memory_ratio;
    DimensionScore {
        score: combined.clamp(0.0, 1.0),
        explanation: format!("{:.0}% of current capacity", combined * 100.0),
        current_value: format!("{} vCPU / {} GB", vcpu, memory),
        alternative_value: format!("{} vCPU / {} GB", alt.vcpu, alt.memory_gb),
        confidence: 0.8,
    }
}

fn availability(input: &ScoringInput<'_>) -> DimensionScore {
    let current = sla_tier(input.current.provider, &input.current.sku_family);
    let alternative = sla_tier(
        input.alternative.alternative_provider,
        &alternative_family(input.alternative),
    );

    let (score, explanation) = if alternative >= current {
        (1.0, "Same or better availability tier")
    } else if alternative + 1 == current {
        (0.75, "One availability tier lower")
    } else {
        (0.5, "Several availability tiers lower")
    };
    DimensionScore {
        score,
        explanation: explanation.to_string(),
        current_value: format!("tier {}", current),
        alternative_value: format!("tier {}", alternative),
        confidence: 0.6,
    }
}

fn migration_effort(input: &ScoringInput<'_>) -> DimensionScore {
    let alt = input.alternative;
    let family = alternative_family(alt);
    let (score, explanation) = if alt.alternative_provider != input.current.provider {
        (0.3, "Cross-provider migration")
    } else if family == input.current.sku_family {
        (1.0, "Same provider and instance family")
    } else {
        (0.75, "Same provider, different instance family")
    };
    DimensionScore {
        score,
        explanation: explanation.to_string(),
        current_value: format!("{}/{}", input.current.provider, input.current.sku_family),
        alternative_value: format!("{}/{}", alt.alternative_provider, family),
        confidence: 0.7,
    }
}

fn vendor_lock_in(input: &ScoringInput<'_>) -> DimensionScore {
    let alt = input.alternative;
    let (score, explanation) = if alt.is_cross_cloud() {
        (0.9, "Moves to a different cloud")
    } else {
        match alt.resource_type {
            ResourceType::Compute | ResourceType::Container => (0.8, "Portable compute"),
            ResourceType::Storage => (0.6, "Storage with provider-specific APIs"),
            ResourceType::Database => {
                let sku = alt.alternative_sku.to_ascii_lowercase();
                if PROPRIETARY_DATABASE_MARKERS.iter().any(|m| sku.contains(m)) {
                    (0.3, "Proprietary database engine")
                } else {
                    (0.6, "Open-source compatible database")
                }
            }
            ResourceType::Serverless => (0.3, "Serverless runtime tied to the provider"),
            ResourceType::Network | ResourceType::Other => (0.5, "Portability not assessed"),
        }
    };
    DimensionScore {
        score,
        explanation: explanation.to_string(),
        current_value: input.current.provider.to_string(),
        alternative_value: alt.alternative_provider.to_string(),
        confidence: 0.5,
    }
}

fn environmental_impact(input: &ScoringInput<'_>) -> DimensionScore {
    let region = &input.current.region;
    let intensity = match carbon_intensity(region) {
        Some(i) => i,
        None => return DimensionScore::unknown(format!("No carbon data for region {}", region)),
    };

    let bonus = match input.current.vcpu {
        Some(current) if current > 0 => {
            (0.2 * (1.0 - input.alternative.vcpu as f64 / current as f64)).clamp(0.0, 0.2)
        }
        _ => 0.0,
    };
    DimensionScore {
        score: ((1.0 - intensity) + bonus).min(1.0),
        explanation: format!(
            "Region carbon intensity {:.2}, efficiency bonus {:.2}",
            intensity, bonus
        ),
        current_value: format!("{} vCPU", input.current.vcpu.map_or("?".to_string(), |v| v.to_string())),
        alternative_value: format!("{} vCPU", input.alternative.vcpu),
        confidence: 0.6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlternativeCategory;

    fn current() -> CurrentResource {
        CurrentResource {
            tenant: "acme".to_string(),
            provider: Provider::Aws,
            resource_id: "i-1".to_string(),
            resource_type: ResourceType::Compute,
            sku: "m5.xlarge".to_string(),
            sku_family: "m5".to_string(),
            region: "us-east".to_string(),
            vcpu: Some(4),
            memory_gb: Some(16.0),
            hourly_price: Some(0.192),
            monthly_cost: Some(0.192 * 730.0),
        }
    }

    fn alternative(provider: Provider, sku: &str, vcpu: u32, memory_gb: f64) -> ResourceAlternative {
        ResourceAlternative {
            id: 1,
            provider: Provider::Aws,
            resource_type: ResourceType::Compute,
            current_sku: "m5.xlarge".to_string(),
            alternative_sku: sku.to_string(),
            alternative_provider: provider,
            vcpu,
            memory_gb,
            sku_family: String::new(),
            category: if provider == Provider::Aws {
                AlternativeCategory::Downsize
            } else {
                AlternativeCategory::CrossCloud
            },
        }
    }

    fn score(kind: DimensionKind, alt: &ResourceAlternative, alt_hourly: Option<f64>) -> DimensionScore {
        let current = current();
        let config = TradeoffConfig::default();
        score_dimension(
            kind,
            &ScoringInput {
                current: &current,
                alternative: alt,
                alternative_hourly: alt_hourly,
                config: &config,
            },
        )
    }

    #[test]
    fn test_sku_family() {
        assert_eq!(sku_family(Provider::Aws, "m5.xlarge"), "m5");
        assert_eq!(sku_family(Provider::Aws, "db.r5.large"), "r5");
        assert_eq!(sku_family(Provider::Azure, "Standard_D4s_v3"), "d");
        assert_eq!(sku_family(Provider::Azure, "Standard_B2ms"), "b");
        assert_eq!(sku_family(Provider::Gcp, "n2-standard-4"), "n2");
    }

    #[test]
    fn test_cost_score() {
        let alt = alternative(Provider::Aws, "m5.large", 2, 8.0);
        let s = score(DimensionKind::Cost, &alt, Some(0.096));
        assert!((s.score - 0.75).abs() < 1e-9);
        assert_eq!(s.confidence, 0.9);

        let pricier = score(DimensionKind::Cost, &alt, Some(0.576));
        assert_eq!(pricier.score, 0.0);

        let unknown = score(DimensionKind::Cost, &alt, None);
        assert_eq!(unknown.score, 0.5);
        assert!(unknown.is_unknown());
    }

    #[test]
    fn test_performance_score() {
        let half = score(DimensionKind::Performance, &alternative(Provider::Aws, "m5.large", 2, 8.0), None);
        assert!((half.score - 0.5).abs() < 1e-9);

        let bigger = score(DimensionKind::Performance, &alternative(Provider::Aws, "m5.2xlarge", 8, 32.0), None);
        assert_eq!(bigger.score, 1.0);
    }

    #[test]
    fn test_availability_score() {
        let same = score(DimensionKind::Availability, &alternative(Provider::Aws, "m5.large", 2, 8.0), None);
        assert_eq!(same.score, 1.0);

        let default_tier = score(DimensionKind::Availability, &alternative(Provider::Aws, "x9.large", 2, 8.0), None);
        assert_eq!(default_tier.score, 0.75);

        let burstable = score(DimensionKind::Availability, &alternative(Provider::Aws, "t3.large", 2, 8.0), None);
        assert_eq!(burstable.score, 0.5);
    }

    #[test]
    fn test_migration_effort() {
        let s = |alt: ResourceAlternative| score(DimensionKind::MigrationEffort, &alt, None).score;
        assert_eq!(s(alternative(Provider::Aws, "m5.large", 2, 8.0)), 1.0);
        assert_eq!(s(alternative(Provider::Aws, "c5.large", 2, 4.0)), 0.75);
        assert_eq!(s(alternative(Provider::Gcp, "n2-standard-2", 2, 8.0)), 0.3);
    }

    #[test]
    fn test_vendor_lock_in() {
        assert_eq!(
            score(DimensionKind::VendorLockIn, &alternative(Provider::Gcp, "n2-standard-2", 2, 8.0), None).score,
            0.9
        );
        assert_eq!(
            score(DimensionKind::VendorLockIn, &alternative(Provider::Aws, "m5.large", 2, 8.0), None).score,
            0.8
        );

        let mut aurora = alternative(Provider::Aws, "db.aurora.r5.large", 2, 16.0);
        aurora.resource_type = ResourceType::Database;
        assert_eq!(score(DimensionKind::VendorLockIn, &aurora, None).score, 0.3);
        aurora.alternative_sku = "db.r5.large".to_string();
        assert_eq!(score(DimensionKind::VendorLockIn, &aurora, None).score, 0.6);
    }

    #[test]
    fn test_environmental_impact() {
        let alt = alternative(Provider::Aws, "m5.large", 2, 8.0);
        let s = score(DimensionKind::EnvironmentalImpact, &alt, None);
        // us-east intensity 0.45, half the vCPUs earns a 0.1 bonus
        assert!((s.score - 0.65).abs() < 1e-9);

        let config = TradeoffConfig::default();
        let mut unknown_region = current();
        unknown_region.region = "moon-base".to_string();
        let s = score_dimension(
            DimensionKind::EnvironmentalImpact,
            &ScoringInput {
                current: &unknown_region,
                alternative: &alt,
                alternative_hourly: None,
                config: &config,
            },
        );
        assert!(s.is_unknown());
    }
}
