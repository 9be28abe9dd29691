//! Resource analysis command

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use optimizer_lib::{AnalysisRequest, AnalysisResult, Provider, Recommendation};
use tabled::Tabled;

use crate::output::{
    color_confidence, color_savings, color_status, format_currency, print_heading, print_info,
    print_json, print_table, OutputFormat,
};
use crate::pipeline::Pipeline;

/// Row for recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Savings/mo")]
    savings: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Risk")]
    risk: String,
}

impl From<&Recommendation> for RecommendationRow {
    fn from(r: &Recommendation) -> Self {
        Self {
            id: truncate_id(&r.id.to_string()),
            action: r.action.to_string(),
            summary: r.summary.clone(),
            savings: color_savings(r.estimated_monthly_savings),
            confidence: color_confidence(r.confidence),
            risk: color_status(&r.risk_level.to_string()),
        }
    }
}

/// Analyze one resource and print its recommendations
pub async fn analyze(
    pipeline: &Pipeline,
    tenant: &str,
    provider: Provider,
    resource_id: &str,
    at: Option<DateTime<Utc>>,
    format: OutputFormat,
) -> Result<()> {
    let at = at.unwrap_or_else(|| pipeline.analysis_time(tenant, provider, resource_id));
    let result = pipeline
        .recommendation_engine()
        .analyze_resource_at(tenant, provider, resource_id, &AnalysisRequest::default(), at)
        .await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_analysis(&result),
    }
    Ok(())
}

fn print_analysis(result: &AnalysisResult) {
    print_heading("Resource Analysis");
    println!(
        "Resource:               {} ({}/{})",
        result.resource_id.cyan(),
        result.provider,
        result.tenant
    );
    println!("Status:                 {}", color_status(result.status.as_str()));
    println!(
        "Classification:         {}",
        color_status(&result.classification.to_string())
    );
    println!("Confidence:             {}", color_confidence(result.confidence));

    if let Some(summary) = &result.cost_summary {
        println!();
        println!("{}", "Costs".bold());
        println!("{}", "-".repeat(50));
        println!("SKU:                    {}", summary.sku);
        println!("Region:                 {}", summary.canonical_region);
        println!("Days of data:           {}", summary.data_point_count);
        println!(
            "Average daily:          {}",
            format_currency(summary.avg_daily_cost)
        );
        println!(
            "Monthly (30 days):      {}",
            format_currency(summary.monthly_cost())
        );
    }

    if let Some(forecast) = &result.forecast {
        if forecast.success {
            println!(
                "Forecast next month:    {} ({})",
                format_currency(forecast.monthly_cost_forecast),
                forecast.model_used.dimmed()
            );
        }
    }

    if !result.anomalies.is_empty() {
        println!(
            "Anomalies:              {}",
            result.anomalies.len().to_string().yellow()
        );
    }

    if let Some(message) = &result.message {
        println!();
        print_info(message);
    }

    println!();
    let rows: Vec<RecommendationRow> = result.recommendations.iter().map(Into::into).collect();
    print_table(&rows, "No recommendations");

    if !rows.is_empty() {
        println!(
            "{} {}",
            "Total potential savings:".bold(),
            color_savings(result.total_monthly_savings).bold()
        );
    }
}

/// Truncate a UUID for display
fn truncate_id(id: &str) -> String {
    if id.len() > 8 {
        format!("{}...", &id[..8])
    } else {
        id.to_string()
    }
}
