//! Alternative SKU comparison command

use anyhow::Result;
use colored::Colorize;
use optimizer_lib::{tradeoff::ScoreDirection, AlternativeComparison, Provider};
use tabled::Tabled;

use crate::output::{
    color_savings, format_currency, format_optional, print_heading, print_json, print_table,
    OutputFormat,
};
use crate::pipeline::Pipeline;

/// Row for ranked alternatives table
#[derive(Tabled)]
struct AlternativeRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "Monthly")]
    monthly_cost: String,
    #[tabled(rename = "Savings/mo")]
    savings: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Improves")]
    improves: String,
}

/// Rank the alternatives for a resource's SKU
pub async fn alternatives(
    pipeline: &Pipeline,
    tenant: &str,
    provider: Provider,
    resource_id: &str,
    sku: &str,
    region: &str,
    format: OutputFormat,
) -> Result<()> {
    let comparison = pipeline
        .tradeoff_scorer()
        .compare_alternatives(tenant, provider, resource_id, sku, region)
        .await?;

    match format {
        OutputFormat::Json => print_json(&comparison)?,
        OutputFormat::Table => print_comparison(&comparison),
    }
    Ok(())
}

fn print_comparison(comparison: &AlternativeComparison) {
    let current = &comparison.current_resource;
    print_heading("Alternatives");
    println!("Resource:               {}", current.resource_id.cyan());
    println!("SKU:                    {} ({})", current.sku, current.region);
    println!(
        "Monthly cost:           {}",
        format_optional(current.monthly_cost.map(format_currency))
    );
    if comparison.preferences.minimum_savings_threshold > 0.0 {
        println!(
            "Savings threshold:      {}",
            format_currency(comparison.preferences.minimum_savings_threshold)
        );
    }
    println!();

    let rows: Vec<AlternativeRow> = comparison
        .ranked_alternatives
        .iter()
        .enumerate()
        .map(|(i, ranked)| {
            let improves: Vec<String> = ranked
                .dimensions
                .iter()
                .filter(|d| d.direction == ScoreDirection::Improvement && !d.score.is_unknown())
                .map(|d| d.dimension.to_string())
                .collect();
            AlternativeRow {
                rank: i + 1,
                provider: ranked.alternative.alternative_provider.to_string(),
                sku: ranked.alternative.alternative_sku.clone(),
                monthly_cost: format_optional(ranked.monthly_cost.map(format_currency)),
                savings: color_savings(ranked.estimated_monthly_savings),
                score: format!("{:.2}", ranked.overall_score),
                improves: if improves.is_empty() {
                    "-".to_string()
                } else {
                    improves.join(", ")
                },
            }
        })
        .collect();
    print_table(&rows, "No alternatives meet the savings threshold");
}
