//! Row transformations: raw extract rows to typed star-schema records.
//!
//! Builders populate the external dimension tables and hand back the
//! in-memory natural-key dictionaries; the aggregator groups sale line items;
//! the linker joins the two and emits facts. Each stage owns its output and
//! the next stage borrows it read-only.

pub mod dimensions;
pub mod sales;

pub use dimensions::{DimensionBuild, DimensionEntry, build_product_dimension, build_user_dimension};
pub use sales::{
    AggregatedSale, LinkStats, SaleAggregation, SaleGroupKey, aggregate_sales, link_facts,
};

use snafu::prelude::*;
use std::str::FromStr;

use crate::error::{BadIntSnafu, TransformError};

/// Parse a mandatory integer field; failure aborts the run.
pub(crate) fn parse_int<T>(value: &str, field: &'static str) -> Result<T, TransformError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    value.parse().context(BadIntSnafu { field, value })
}
