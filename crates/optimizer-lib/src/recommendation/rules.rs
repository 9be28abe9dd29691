//! Recommendation rules
//!
//! Each rule is independent; any combination may fire for one analysis.

use super::RecommendationConfig;
use crate::forecast::ForecastResult;
use crate::models::{
    DetectedConfig, NormalizedResourceCost, Provider, Recommendation, RecommendationAction,
    RecommendationStatus, ResourceType,
};
use crate::utilization::{Classification, RightsizingAction, RightsizingResult, UtilizationState};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

/// Inputs shared by every rule
pub(crate) struct RuleContext<'a> {
    pub tenant: &'a str,
    pub provider: Provider,
    pub resource_id: &'a str,
    pub summary: &'a NormalizedResourceCost,
    pub classification: &'a Classification,
    pub rightsizing: &'a RightsizingResult,
    pub forecast: &'a ForecastResult,
    pub vcpu: Option<u32>,
    pub memory_gb: Option<f64>,
    pub now: DateTime<Utc>,
    pub config: &'a RecommendationConfig,
}

impl RuleContext<'_> {
    fn current_config(&self) -> serde_json::Value {
        json!({
            "sku": self.summary.sku,
            "region": self.summary.canonical_region,
            "vcpu": self.vcpu,
            "memory_gb": self.memory_gb,
            "monthly_cost": round_cents(self.summary.monthly_cost()),
        })
    }

    fn draft(&self, action: RecommendationAction, savings: f64, base_monthly: f64) -> Recommendation {
        draft(
            Identity {
                tenant: self.tenant,
                provider: self.provider,
                resource_id: self.resource_id,
                resource_name: &self.summary.resource_name,
                resource_type: self.summary.resource_type,
            },
            action,
            savings,
            base_monthly,
            self.current_config(),
            self.now,
            self.config.expiry_days,
        )
    }
}

struct Identity<'a> {
    tenant: &'a str,
    provider: Provider,
    resource_id: &'a str,
    resource_name: &'a str,
    resource_type: ResourceType,
}

fn draft(
    identity: Identity<'_>,
    action: RecommendationAction,
    savings: f64,
    base_monthly: f64,
    current_config: serde_json::Value,
    now: DateTime<Utc>,
    expiry_days: i64,
) -> Recommendation {
    let savings = savings.max(0.0);
    let savings_percentage = if base_monthly > 0.0 {
        savings / base_monthly * 100.0
    } else {
        0.0
    };

    Recommendation {
        id: Uuid::new_v4(),
        tenant: identity.tenant.to_string(),
        provider: identity.provider,
        resource_id: identity.resource_id.to_string(),
        resource_name: identity.resource_name.to_string(),
        resource_type: identity.resource_type,
        action,
        summary: String::new(),
        details: String::new(),
        current_config,
        suggested_config: None,
        estimated_monthly_savings: round_cents(savings),
        savings_percentage: (savings_percentage * 10.0).round() / 10.0,
        confidence: 0.0,
        risk_level: action.risk_level(),
        status: RecommendationStatus::Active,
        generated_at: now,
        expires_at: now + Duration::days(expiry_days),
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// All recommendations the rules produce for one analysis
pub(crate) fn generate(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    [rightsizing(ctx), reservation(ctx), scheduling(ctx)]
        .into_iter()
        .flatten()
        .collect()
}

fn rightsizing(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let rs = ctx.rightsizing;
    let confidence = ctx.classification.confidence;
    if !rs.action_recommended
        || rs.estimated_monthly_savings < ctx.config.min_savings
        || confidence < ctx.config.min_confidence
    {
        return None;
    }

    let name = &ctx.summary.resource_name;
    let (action, summary, suggested) = match rs.action? {
        RightsizingAction::DeleteOrStop => (
            RecommendationAction::DeleteResource,
            format!("Delete or stop idle resource {}", name),
            None,
        ),
        RightsizingAction::Downsize => (
            RecommendationAction::DownsizeInstance,
            format!(
                "Downsize {} to {} vCPU",
                name,
                describe_vcpu(rs.recommended_vcpu)
            ),
            Some(json!({
                "vcpu": rs.recommended_vcpu,
                "memory_gb": rs.recommended_memory_gb,
                "reduction_factor": rs.reduction_factor,
            })),
        ),
        RightsizingAction::Upsize => (
            RecommendationAction::UpsizeInstance,
            format!("Upsize {} to {} vCPU", name, describe_vcpu(rs.recommended_vcpu)),
            Some(json!({
                "vcpu": rs.recommended_vcpu,
                "memory_gb": rs.recommended_memory_gb,
            })),
        ),
    };

    let mut rec = ctx.draft(action, rs.estimated_monthly_savings, ctx.summary.monthly_cost());
    rec.summary = summary;
    rec.details = format!(
        "{}. {} over {} days of data.",
        rs.reason, ctx.classification.reason, ctx.classification.stats.data_points
    );
    rec.suggested_config = suggested;
    rec.confidence = confidence;
    Some(rec)
}

fn describe_vcpu(vcpu: Option<u32>) -> String {
    vcpu.map_or_else(|| "a smaller size".to_string(), |v| v.to_string())
}

fn reservation(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let forecast = ctx.forecast;
    if ctx.classification.state != UtilizationState::Optimized
        || !forecast.success
        || forecast.confidence < ctx.config.reservation_min_confidence
    {
        return None;
    }

    let savings = forecast.monthly_cost_forecast * ctx.config.reservation_savings_rate;
    if savings < ctx.config.min_savings {
        return None;
    }

    let mut rec = ctx.draft(
        RecommendationAction::PurchaseReservation,
        savings,
        forecast.monthly_cost_forecast,
    );
    rec.summary = format!("Purchase a reservation for {}", ctx.summary.resource_name);
    rec.details = format!(
        "Steady utilization and a forecast of ${:.2}/month make a commitment worthwhile.",
        forecast.monthly_cost_forecast
    );
    rec.suggested_config = Some(json!({
        "commitment": "reserved",
        "estimated_monthly_cost": round_cents(forecast.monthly_cost_forecast - savings),
    }));
    rec.confidence = forecast.confidence;
    Some(rec)
}

fn scheduling(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    if ctx.classification.state == UtilizationState::Overutilized
        || !is_non_production(
            &ctx.config.non_production_markers,
            &ctx.summary.resource_name,
            ctx.resource_id,
        )
    {
        return None;
    }

    let monthly = ctx.summary.monthly_cost();
    let savings = monthly * ctx.config.scheduling_savings_rate;
    if savings < ctx.config.min_savings {
        return None;
    }

    let mut rec = ctx.draft(RecommendationAction::ScheduleShutdown, savings, monthly);
    rec.summary = format!("Schedule off-hours shutdown for {}", ctx.summary.resource_name);
    rec.details =
        "Resource looks non-production; running it 12 hours a day halves its cost.".to_string();
    rec.suggested_config = Some(json!({ "running_hours_per_day": 12 }));
    rec.confidence = ctx.config.scheduling_confidence;
    Some(rec)
}

/// True when the name or id contains a non-production marker
pub fn is_non_production(markers: &[String], resource_name: &str, resource_id: &str) -> bool {
    let name = resource_name.to_ascii_lowercase();
    let id = resource_id.to_ascii_lowercase();
    markers.iter().any(|m| {
        let m = m.to_ascii_lowercase();
        !m.is_empty() && (name.contains(&m) || id.contains(&m))
    })
}

/// Generic review recommendation for a resource with no cost history
pub(crate) fn review_sizing(
    tenant: &str,
    provider: Provider,
    resource_id: &str,
    detected: &DetectedConfig,
    now: DateTime<Utc>,
    config: &RecommendationConfig,
) -> Option<Recommendation> {
    if !detected.resource_type.is_optimizable() {
        return None;
    }

    let name = detected.resource_name.as_deref().unwrap_or(resource_id);
    let current_config = json!({
        "sku": detected.sku,
        "region": detected.region,
        "vcpu": detected.vcpu,
        "memory_gb": detected.memory_gb,
    });

    let mut rec = draft(
        Identity {
            tenant,
            provider,
            resource_id,
            resource_name: name,
            resource_type: detected.resource_type,
        },
        RecommendationAction::ReviewSizing,
        0.0,
        0.0,
        current_config,
        now,
        config.expiry_days,
    );
    rec.summary = format!("Review sizing of {}", name);
    rec.details =
        "No cost history is available yet; check that the configured size matches the workload."
            .to_string();
    rec.confidence = config.no_history_confidence;
    Some(rec)
}
