//! ratecache command-line client
//!
//! Looks up Open Exchange Rates tables through the caching lookup service.
//!
//! ```bash
//! export OPEN_EXCHANGE_APP_ID=...
//! ratecache --base AUD latest
//! ratecache rate NZD --date 2012-07-10
//! ratecache watch --interval-ms 500 --count 20 --code NZD
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ratecache_common::{AsOf, Currency};
use ratecache_fx::{RateLookupService, ServiceConfig};
use ratecache_oxr::{OxrClient, OxrConfig, OXR_DEFAULT_BASE};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;
mod watch;

use output::Printer;
use watch::WatchPlan;

/// ratecache CLI
#[derive(Parser, Debug)]
#[command(name = "ratecache")]
#[command(about = "Cached exchange-rate lookups against Open Exchange Rates")]
#[command(version)]
struct Args {
    /// Open Exchange Rates app id
    #[arg(long, env = "OPEN_EXCHANGE_APP_ID", hide_env_values = true)]
    app_id: Option<String>,

    /// Base currency for lookups (defaults to the provider's base)
    #[arg(short, long)]
    base: Option<String>,

    /// Cache lifetime in milliseconds
    #[arg(long)]
    ttl_ms: Option<u64>,

    /// Upstream fetch timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the latest rate table
    Latest,

    /// Show the rate table for a past date
    Historical {
        /// Date (YYYY-MM-DD)
        date: NaiveDate,
    },

    /// Show a single rate
    Rate {
        /// Quoted currency code
        code: String,

        /// Date (YYYY-MM-DD); latest when omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List the currencies the provider knows
    Currencies,

    /// Repeat a lookup and report cache behaviour
    Watch {
        /// Delay between lookups
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Number of lookups (0 = until Ctrl+C)
        #[arg(long, default_value = "10")]
        count: u64,

        /// Look up a single rate instead of the whole table
        #[arg(long)]
        code: Option<String>,
    },
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Merge environment configuration with command-line overrides.
fn build_configs(args: &Args) -> anyhow::Result<(ServiceConfig, OxrConfig)> {
    let mut service_config = ServiceConfig::from_env();
    let mut oxr_config = OxrConfig::from_env();

    if let Some(app_id) = &args.app_id {
        oxr_config.app_id = app_id.trim().to_string();
    }

    if let Some(base) = &args.base {
        let base = Currency::parse(base).with_context(|| format!("invalid --base '{}'", base))?;
        service_config.default_base = Some(base);
    }

    if let Some(ttl) = args.ttl_ms {
        service_config.cache.ttl = Duration::from_millis(ttl);
    }

    if let Some(timeout) = args.timeout_ms {
        service_config.fetch_timeout = Duration::from_millis(timeout);
        oxr_config.request_timeout = Duration::from_millis(timeout);
    }

    service_config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    oxr_config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    Ok((service_config, oxr_config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    let (service_config, oxr_config) = build_configs(&args)?;
    let client = OxrClient::new(oxr_config)?;
    let service = RateLookupService::new(Arc::new(client.clone()), service_config);
    let printer = Printer::new(args.json);

    match args.command {
        Command::Latest => {
            let table = service.latest().await?;
            printer.table(&table)?;
        }
        Command::Historical { date } => {
            let table = service.historical(date).await?;
            printer.table(&table)?;
        }
        Command::Rate { code, date } => {
            let as_of = date.map(AsOf::Date).unwrap_or_default();
            let base = service
                .base_currency()
                .unwrap_or_else(|| Currency::new(OXR_DEFAULT_BASE));
            let rate = service.get_rate(base.code(), as_of, &code).await?;
            printer.rate(&base, &code, as_of, rate)?;
        }
        Command::Currencies => {
            let currencies = client.currencies().await?;
            printer.currencies(&currencies)?;
        }
        Command::Watch {
            interval_ms,
            count,
            code,
        } => {
            let plan = WatchPlan {
                interval: Duration::from_millis(interval_ms),
                count: (count > 0).then_some(count),
                code,
            };
            let summary = watch::run(&service, &plan, &printer).await?;
            info!(
                lookups = summary.lookups,
                failures = summary.failures,
                avg_latency_us = summary.average_latency_us(),
                "Watch complete"
            );
            printer.stats(&service.stats())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_with_date() {
        let args = Args::try_parse_from([
            "ratecache",
            "--app-id",
            "12345",
            "--base",
            "aud",
            "rate",
            "NZD",
            "--date",
            "2012-07-10",
        ])
        .unwrap();

        assert_eq!(args.base.as_deref(), Some("aud"));
        match args.command {
            Command::Rate { code, date } => {
                assert_eq!(code, "NZD");
                assert_eq!(date, NaiveDate::from_ymd_opt(2012, 7, 10));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_date() {
        let result = Args::try_parse_from(["ratecache", "historical", "10/07/2012"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_configuration() {
        let args = Args::try_parse_from([
            "ratecache",
            "--app-id",
            "12345",
            "--base",
            "aud",
            "--ttl-ms",
            "250",
            "--timeout-ms",
            "1500",
            "latest",
        ])
        .unwrap();

        let (service_config, oxr_config) = build_configs(&args).unwrap();

        assert_eq!(service_config.default_base, Some(Currency::aud()));
        assert_eq!(service_config.cache.ttl, Duration::from_millis(250));
        assert_eq!(service_config.fetch_timeout, Duration::from_millis(1500));
        assert_eq!(oxr_config.request_timeout, Duration::from_millis(1500));
        assert_eq!(oxr_config.app_id, "12345");
    }

    #[test]
    fn test_invalid_base_flag_is_rejected() {
        let args =
            Args::try_parse_from(["ratecache", "--app-id", "12345", "--base", "dollars", "latest"])
                .unwrap();

        assert!(build_configs(&args).is_err());
    }
}
