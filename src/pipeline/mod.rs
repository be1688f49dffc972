//! Main processing pipeline.
//!
//! Runs the batch end to end, strictly in stage order: build the user and
//! product dimensions, aggregate the sale extract, link facts, commit. Every
//! stage completes before the next begins; on any failure the warehouse
//! transaction is dropped uncommitted, so the run is all-or-nothing.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::{Config, InputConfig};
use crate::error::{EtlError, SourceSnafu, WarehouseSnafu};
use crate::source::{CsvSource, MemberRow, ProductRow, SaleRow};
use crate::transform::{aggregate_sales, build_product_dimension, build_user_dimension, link_facts};
use crate::warehouse::{PostgresWarehouse, Warehouse};
use snafu::prelude::*;

/// Statistics about a load run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub members_read: u64,
    pub products_read: u64,
    pub sales_read: u64,
    pub users_built: u64,
    pub products_built: u64,
    pub time_entries: u64,
    pub sale_groups: u64,
    pub facts_inserted: u64,
    pub orphans_dropped: u64,
}

/// Run the whole batch against an already-open warehouse.
///
/// Separated from [`run_pipeline`] so tests can drive the full flow against
/// an in-memory warehouse.
pub async fn run_etl<W: Warehouse>(
    inputs: &InputConfig,
    warehouse: &mut W,
) -> Result<RunStats, EtlError> {
    let delimiter = inputs.delimiter_byte();
    let mut stats = RunStats::default();

    // All three input handles are acquired up front; a missing file fails
    // the run before any dimension row is written.
    let mut member_source: CsvSource<MemberRow> =
        CsvSource::open(&inputs.member, delimiter).context(SourceSnafu)?;
    let mut product_source: CsvSource<ProductRow> =
        CsvSource::open(&inputs.product, delimiter).context(SourceSnafu)?;
    let mut sale_source: CsvSource<SaleRow> =
        CsvSource::open(&inputs.sale, delimiter).context(SourceSnafu)?;

    info!("Building user dimension");
    let users = build_user_dimension(member_source.rows(), warehouse).await?;
    stats.members_read = users.rows_read;
    stats.users_built = users.entries.len() as u64;
    debug!("{} user dimension entries", users.entries.len());

    info!("Building product dimension");
    let products = build_product_dimension(product_source.rows(), warehouse).await?;
    stats.products_read = products.rows_read;
    stats.products_built = products.entries.len() as u64;
    debug!("{} product dimension entries", products.entries.len());

    info!("Aggregating sales");
    let aggregation = aggregate_sales(sale_source.rows(), warehouse).await?;
    stats.sales_read = aggregation.rows_read;
    stats.sale_groups = aggregation.groups.len() as u64;
    stats.time_entries = aggregation
        .groups
        .keys()
        .map(|k| (k.year, k.month, k.day))
        .collect::<HashSet<_>>()
        .len() as u64;

    info!("Linking facts");
    let link = link_facts(&aggregation.groups, &users.entries, &products.entries, warehouse).await?;
    stats.facts_inserted = link.facts_inserted;
    stats.orphans_dropped = link.orphans_dropped;

    warehouse
        .commit()
        .await
        .context(WarehouseSnafu)?;
    info!("Batch committed");

    Ok(stats)
}

/// Connect to the Postgres warehouse and run the batch.
pub async fn run_pipeline(config: Config) -> Result<RunStats, EtlError> {
    let mut warehouse = PostgresWarehouse::connect(&config.warehouse)
        .await
        .context(WarehouseSnafu)?;
    run_etl(&config.inputs, &mut warehouse).await
}
