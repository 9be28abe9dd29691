//! Forecast and utilization commands

use anyhow::Result;
use colored::Colorize;
use optimizer_lib::{forecast::CostAnomaly, normalizer, ForecastResult, Provider};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    color_confidence, color_status, format_currency, format_optional, format_percent,
    print_heading, print_info, print_json, print_table, print_warning, OutputFormat,
};
use crate::pipeline::Pipeline;

#[derive(Tabled)]
struct DailyForecastRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Forecast")]
    cost: String,
}

#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Z-score")]
    z_score: String,
}

#[derive(Serialize)]
struct ForecastOutput {
    resource_id: String,
    data_points: usize,
    forecast: ForecastResult,
    anomalies: Vec<CostAnomaly>,
}

/// Forecast a resource's cost and list anomalous days
pub async fn forecast(
    pipeline: &Pipeline,
    tenant: &str,
    provider: Provider,
    resource_id: &str,
    horizon_days: usize,
    format: OutputFormat,
) -> Result<()> {
    let series = pipeline.time_series(tenant, provider, resource_id).await?;
    let engine = pipeline.forecast_engine();
    let output = ForecastOutput {
        resource_id: resource_id.to_string(),
        data_points: series.len(),
        forecast: engine.forecast(&series, horizon_days).await,
        anomalies: engine.detect_anomalies(&series),
    };

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Table => print_forecast(&output),
    }
    Ok(())
}

fn print_forecast(output: &ForecastOutput) {
    print_heading("Cost Forecast");
    println!("Resource:               {}", output.resource_id.cyan());
    println!("Days of data:           {}", output.data_points);

    let forecast = &output.forecast;
    if !forecast.success {
        println!();
        print_warning("Not enough history to forecast");
        return;
    }

    println!("Model:                  {}", forecast.model_used);
    println!("Confidence:             {}", color_confidence(forecast.confidence));
    println!(
        "Monthly forecast:       {}",
        format_currency(forecast.monthly_cost_forecast).bold()
    );
    println!(
        "Range:                  {} - {}",
        format_currency(forecast.lower_bound),
        format_currency(forecast.upper_bound)
    );
    println!();

    let rows: Vec<DailyForecastRow> = forecast
        .daily_forecasts
        .iter()
        .map(|d| DailyForecastRow {
            date: d.date.to_string(),
            cost: format_currency(d.cost),
        })
        .collect();
    print_table(&rows, "No daily forecasts");

    println!();
    println!("{}", "Anomalies".bold());
    let rows: Vec<AnomalyRow> = output
        .anomalies
        .iter()
        .map(|a| AnomalyRow {
            date: a.date.to_string(),
            kind: a.kind.to_string(),
            cost: format_currency(a.cost),
            expected: format_currency(a.expected_cost),
            z_score: format!("{:.2}", a.z_score),
        })
        .collect();
    print_table(&rows, "No anomalies detected");
}

/// Classify a resource's utilization and show rightsizing guidance
pub async fn classify(
    pipeline: &Pipeline,
    tenant: &str,
    provider: Provider,
    resource_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let records = pipeline.records(tenant, provider, resource_id).await?;
    let series = normalizer::to_time_series(&records);
    let classifier = pipeline.classifier();

    let classification = classifier.classify(&series);
    let rightsizing = normalizer::summarize(&records).map(|summary| {
        classifier.analyze_rightsizing(
            &classification,
            summary.avg_daily_cost,
            summary.vcpu,
            summary.memory_gb,
        )
    });
    let trend = classifier.detect_trend(&series);

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "resource_id": resource_id,
            "classification": classification,
            "rightsizing": rightsizing,
            "trend": trend,
        }));
    }

    print_heading("Utilization");
    println!("Resource:               {}", resource_id.cyan());
    println!(
        "State:                  {}",
        color_status(&classification.state.to_string())
    );
    println!(
        "Confidence:             {}",
        color_confidence(classification.confidence)
    );
    println!(
        "Average CPU:            {}",
        format_optional(classification.stats.avg_cpu.map(format_percent))
    );
    println!(
        "Peak CPU:               {}",
        format_optional(classification.stats.max_cpu.map(format_percent))
    );
    println!(
        "Longest idle streak:    {} days",
        classification.stats.max_consecutive_idle_days
    );
    println!("Trend:                  {:?}", trend.direction);
    println!();
    print_info(&classification.reason);

    if let Some(rightsizing) = rightsizing.filter(|r| r.action_recommended) {
        println!();
        println!("{}", "Rightsizing".bold());
        println!("{}", "-".repeat(50));
        println!(
            "vCPU:                   {} -> {}",
            format_optional(rightsizing.current_vcpu),
            format_optional(rightsizing.recommended_vcpu)
        );
        println!(
            "Memory (GB):            {} -> {}",
            format_optional(rightsizing.current_memory_gb),
            format_optional(rightsizing.recommended_memory_gb)
        );
        println!(
            "Savings/mo:             {}",
            format_currency(rightsizing.estimated_monthly_savings).green()
        );
        println!("Reason:                 {}", rightsizing.reason);
    }

    Ok(())
}
