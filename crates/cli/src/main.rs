//! Cloud Cost Optimizer CLI
//!
//! Runs the cost analysis pipeline offline over a JSON dataset and
//! renders forecasts, recommendations, alternatives and validation results.

mod commands;
mod config;
mod output;
mod pipeline;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use commands::{alternatives, analyze, forecast, validate};
use optimizer_lib::Provider;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Cloud Cost Optimizer CLI
#[derive(Parser)]
#[command(name = "cco")]
#[command(author, version, about = "CLI for Cloud Cost Optimizer", long_about = None)]
pub struct Cli {
    /// JSON dataset to analyze (can also be set via CCO_DATA env var)
    #[arg(long, env = "CCO_DATA", global = true)]
    pub data: Option<PathBuf>,

    /// Tenant to analyze (can also be set via CCO_TENANT env var)
    #[arg(long, short, env = "CCO_TENANT", global = true)]
    pub tenant: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a resource and generate recommendations
    Analyze {
        /// Cloud provider (aws, azure, gcp)
        #[arg(value_parser = parse_provider)]
        provider: Provider,

        /// Provider resource identifier
        resource_id: String,

        /// Analysis time (YYYY-MM-DD or RFC 3339); defaults to the last recorded day
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<Utc>>,
    },

    /// Forecast a resource's cost and detect anomalies
    Forecast {
        /// Cloud provider (aws, azure, gcp)
        #[arg(value_parser = parse_provider)]
        provider: Provider,

        /// Provider resource identifier
        resource_id: String,

        /// Days to forecast
        #[arg(long, default_value_t = 30)]
        horizon: usize,
    },

    /// Classify a resource's utilization
    Classify {
        /// Cloud provider (aws, azure, gcp)
        #[arg(value_parser = parse_provider)]
        provider: Provider,

        /// Provider resource identifier
        resource_id: String,
    },

    /// Rank alternative SKUs for a resource
    Alternatives {
        /// Cloud provider (aws, azure, gcp)
        #[arg(value_parser = parse_provider)]
        provider: Provider,

        /// Provider resource identifier
        resource_id: String,

        /// Current SKU
        #[arg(long)]
        sku: String,

        /// Region the resource runs in
        #[arg(long)]
        region: String,
    },

    /// Validate realized savings of implemented recommendations
    Validate {
        /// Validation time (YYYY-MM-DD or RFC 3339); defaults to now
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<Utc>>,
    },
}

fn parse_provider(value: &str) -> Result<Provider, String> {
    value.parse::<Provider>().map_err(|e| e.to_string())
}

/// Accept an RFC 3339 timestamp, or a date meaning the end of that day
fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|at| at.and_utc())
        .ok_or_else(|| format!("invalid time '{}': expected YYYY-MM-DD or RFC 3339", value))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = config.format(cli.format);
    let tenant = config.tenant(cli.tenant);
    let pipeline = pipeline::Pipeline::load(&config.data_file(cli.data)?).await?;

    match cli.command {
        Commands::Analyze {
            provider,
            resource_id,
            at,
        } => {
            analyze::analyze(&pipeline, &tenant, provider, &resource_id, at, format).await?;
        }
        Commands::Forecast {
            provider,
            resource_id,
            horizon,
        } => {
            forecast::forecast(&pipeline, &tenant, provider, &resource_id, horizon, format).await?;
        }
        Commands::Classify {
            provider,
            resource_id,
        } => {
            forecast::classify(&pipeline, &tenant, provider, &resource_id, format).await?;
        }
        Commands::Alternatives {
            provider,
            resource_id,
            sku,
            region,
        } => {
            alternatives::alternatives(&pipeline, &tenant, provider, &resource_id, &sku, &region, format)
                .await?;
        }
        Commands::Validate { at } => {
            validate::validate(&pipeline, at, format).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_instant() {
        let at = parse_instant("2024-06-30").unwrap();
        assert_eq!(at.to_rfc3339(), "2024-06-30T23:59:59+00:00");

        let at = parse_instant("2024-06-30T08:00:00+02:00").unwrap();
        assert_eq!(at.to_rfc3339(), "2024-06-30T06:00:00+00:00");

        assert!(parse_instant("yesterday").is_err());
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!(parse_provider("GCP").unwrap(), Provider::Gcp);
        assert!(parse_provider("oracle").unwrap_err().contains("oracle"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cco", "analyze", "aws", "i-1", "--data", "costs.json", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.data, Some(PathBuf::from("costs.json")));
        assert_eq!(cli.format, Some(output::OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Analyze { provider: Provider::Aws, .. }));
    }
}
