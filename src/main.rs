//! starforge: batch loader for flat CSV extracts into a star schema.
//!
//! Reads member, product and sale CSV extracts and loads them into a
//! Postgres data warehouse as three dimension tables and one fact table,
//! all within a single transaction.

mod config;
mod error;
mod model;
mod pipeline;
mod source;
mod transform;
mod warehouse;

use clap::Parser;
use snafu::prelude::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{ConfigSnafu, EtlError};
use pipeline::run_pipeline;

/// CSV to star-schema warehouse loader.
#[derive(Parser, Debug)]
#[command(name = "starforge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration without touching the warehouse.
    #[arg(long)]
    dry_run: bool,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), EtlError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("starforge starting");

    let config = Config::from_file(&args.config).context(ConfigSnafu)?;

    if args.dry_run {
        info!("Dry run mode - validating configuration");
        info!("Warehouse: {}@{}:{}/{}",
            config.warehouse.user, config.warehouse.host, config.warehouse.port,
            config.warehouse.dbname);
        info!("Member extract: {}", config.inputs.member.display());
        info!("Product extract: {}", config.inputs.product.display());
        info!("Sale extract: {}", config.inputs.sale.display());
        info!("Configuration is valid");
        return Ok(());
    }

    let stats = run_pipeline(config).await?;

    info!("Load completed successfully");
    info!("  Members read: {}", stats.members_read);
    info!("  Products read: {}", stats.products_read);
    info!("  Sales read: {}", stats.sales_read);
    info!("  User dimension rows: {}", stats.users_built);
    info!("  Product dimension rows: {}", stats.products_built);
    info!("  Time dimension rows: {}", stats.time_entries);
    info!("  Sale groups: {}", stats.sale_groups);
    info!("  Facts inserted: {}", stats.facts_inserted);
    if stats.orphans_dropped > 0 {
        info!("  Orphan groups dropped: {}", stats.orphans_dropped);
    }

    Ok(())
}
