//! Savings validation command

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use optimizer_lib::{
    storage::ImplementedRecommendationStore, ImplementedRecommendation, ValidationRunSummary,
};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    color_savings, color_status, format_currency, format_optional, print_heading, print_json,
    print_success, print_table, print_warning, OutputFormat,
};
use crate::pipeline::Pipeline;

/// Row for implemented recommendations table
#[derive(Tabled)]
struct ValidationRow {
    #[tabled(rename = "Resource")]
    resource_id: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Expected/mo")]
    expected: String,
    #[tabled(rename = "Actual/mo")]
    actual: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Note")]
    note: String,
}

impl From<&ImplementedRecommendation> for ValidationRow {
    fn from(item: &ImplementedRecommendation) -> Self {
        Self {
            resource_id: item.resource_id.clone(),
            action: item.action.to_string(),
            expected: format_currency(item.expected_monthly_savings),
            actual: item
                .actual_monthly_savings
                .map(color_savings)
                .unwrap_or_else(|| "-".to_string()),
            status: color_status(&item.validation_status.to_string()),
            note: format_optional(item.validation_note.as_deref()),
        }
    }
}

#[derive(Serialize)]
struct ValidationOutput {
    validated_at: DateTime<Utc>,
    summary: ValidationRunSummary,
    items: Vec<ImplementedRecommendation>,
}

/// Validate every implemented recommendation due at `at` (default: now)
pub async fn validate(
    pipeline: &Pipeline,
    at: Option<DateTime<Utc>>,
    format: OutputFormat,
) -> Result<()> {
    let at = at.unwrap_or_else(Utc::now);
    let summary = pipeline.validator().run_at(at).await?;
    let items = pipeline.repository().list_implemented(None).await?;

    let output = ValidationOutput {
        validated_at: at,
        summary,
        items,
    };
    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Table => print_validation(&output),
    }
    Ok(())
}

fn print_validation(output: &ValidationOutput) {
    let summary = &output.summary;
    print_heading("Savings Validation");
    println!("As of:                  {}", output.validated_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Candidates:             {}", summary.candidates);
    println!("Validated:              {}", summary.validated.to_string().green());
    println!("Partial:                {}", summary.partial.to_string().yellow());
    println!("Failed:                 {}", summary.failed.to_string().red());
    println!("Deferred:               {}", summary.deferred);
    println!();

    if summary.errors > 0 {
        print_warning(&format!("{} items could not be validated", summary.errors));
    } else if summary.candidates > 0 {
        print_success("Validation run completed");
    }

    let rows: Vec<ValidationRow> = output.items.iter().map(Into::into).collect();
    print_table(&rows, "No implemented recommendations");
}
