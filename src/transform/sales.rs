//! Sale aggregation and fact linking.
//!
//! Raw sale rows are grouped by (date, product, member); quantity counts the
//! line items in each group. The first row of a group resolves the time
//! dimension and supplies the price; repeats only bump the count.

use snafu::prelude::*;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::btree_map::Entry;
use tracing::debug;

use crate::error::{
    BadTimestampSnafu, EtlError, SourceError, SourceSnafu, TransformError, TransformSnafu,
    WarehouseSnafu,
};
use crate::model::{ProductRecord, SaleFact, TimeRecord, UserRecord};
use crate::source::SaleRow;
use crate::transform::dimensions::DimensionEntry;
use crate::transform::parse_int;
use crate::warehouse::Warehouse;

/// Grouping key for sale line items.
///
/// Ordered so the aggregation map iterates deterministically; the contract
/// only requires grouping, not order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SaleGroupKey {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub product_id: String,
    pub member_id: String,
}

/// One aggregated group: resolved time entry, price and running quantity.
#[derive(Debug, Clone)]
pub struct AggregatedSale {
    pub time: DimensionEntry<TimeRecord>,
    pub price: i64,
    pub quantity: i64,
}

/// Result of aggregating the sale extract.
#[derive(Debug)]
pub struct SaleAggregation {
    pub groups: BTreeMap<SaleGroupKey, AggregatedSale>,
    pub rows_read: u64,
}

/// Counters from the fact linking stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub facts_inserted: u64,
    /// Groups referencing a member or product never seen by the dimension
    /// builders. Dropped by contract, but counted for the final report.
    pub orphans_dropped: u64,
}

/// Extract (year, month, day) from a `YYYY-MM-DD HH:MM:SS...` timestamp.
fn parse_sale_date(timestamp: &str) -> Result<(i32, i32, i32), TransformError> {
    let date = timestamp.split(' ').next().unwrap_or("");
    let mut parts = date.split('-');
    let fields = (parts.next(), parts.next(), parts.next(), parts.next());
    let (Some(year), Some(month), Some(day), None) = fields else {
        return BadTimestampSnafu { value: timestamp }.fail();
    };

    let parse = |s: &str| {
        s.parse::<i32>()
            .ok()
            .context(BadTimestampSnafu { value: timestamp })
    };
    Ok((parse(year)?, parse(month)?, parse(day)?))
}

/// Group sale rows, resolving a time dimension entry per distinct date.
pub async fn aggregate_sales<W, I>(rows: I, warehouse: &mut W) -> Result<SaleAggregation, EtlError>
where
    W: Warehouse,
    I: IntoIterator<Item = Result<SaleRow, SourceError>>,
{
    let mut groups: BTreeMap<SaleGroupKey, AggregatedSale> = BTreeMap::new();
    let mut rows_read = 0u64;

    for row in rows {
        let row = row.context(SourceSnafu)?;
        rows_read += 1;

        let (year, month, day) = parse_sale_date(&row.timestamp).context(TransformSnafu)?;
        let key = SaleGroupKey {
            year,
            month,
            day,
            product_id: row.product_id,
            member_id: row.member_id,
        };

        match groups.entry(key) {
            Entry::Occupied(mut group) => {
                group.get_mut().quantity += 1;
            }
            Entry::Vacant(slot) => {
                let record = TimeRecord::from_date(year, month, day);
                let time_key = warehouse.ensure_time(&record).await.context(WarehouseSnafu)?;
                slot.insert(AggregatedSale {
                    time: DimensionEntry {
                        record,
                        key: time_key,
                    },
                    price: parse_int(&row.price, "price").context(TransformSnafu)?,
                    quantity: 1,
                });
            }
        }
    }

    Ok(SaleAggregation { groups, rows_read })
}

/// Join aggregated sales to the dimension dictionaries and emit facts.
///
/// A group whose member or product was never built is skipped, not an error.
pub async fn link_facts<W: Warehouse>(
    groups: &BTreeMap<SaleGroupKey, AggregatedSale>,
    users: &HashMap<String, DimensionEntry<UserRecord>>,
    products: &HashMap<String, DimensionEntry<ProductRecord>>,
    warehouse: &mut W,
) -> Result<LinkStats, EtlError> {
    let mut stats = LinkStats::default();

    for (key, sale) in groups {
        let (Some(user), Some(product)) =
            (users.get(&key.member_id), products.get(&key.product_id))
        else {
            stats.orphans_dropped += 1;
            debug!(
                member_id = %key.member_id,
                product_id = %key.product_id,
                "Dropping sale group with unresolved dimension reference"
            );
            continue;
        };

        let fact = SaleFact {
            fk_time: sale.time.key,
            fk_product: product.key,
            fk_user: user.key,
            price: sale.price,
            quantity: sale.quantity,
        };
        warehouse.insert_sale(&fact).await.context(WarehouseSnafu)?;
        stats.facts_inserted += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, SurrogateKey};
    use crate::warehouse::MemoryWarehouse;

    fn sale(timestamp: &str, product_id: &str, member_id: &str, price: &str) -> Result<SaleRow, SourceError> {
        Ok(SaleRow {
            timestamp: timestamp.to_string(),
            product_id: product_id.to_string(),
            member_id: member_id.to_string(),
            price: price.to_string(),
        })
    }

    fn user_entry(member_id: i64, key: SurrogateKey) -> DimensionEntry<UserRecord> {
        DimensionEntry {
            record: UserRecord {
                member_id,
                gender: Gender::Unknown,
                year_joined: 2020,
            },
            key,
        }
    }

    fn product_entry(name: &str, key: SurrogateKey) -> DimensionEntry<ProductRecord> {
        DimensionEntry {
            record: ProductRecord {
                product_name: name.to_string(),
                alcohol_ml: 4500,
                price: 5,
            },
            key,
        }
    }

    #[test]
    fn test_parse_sale_date() {
        assert_eq!(parse_sale_date("2021-06-15 10:00:00").unwrap(), (2021, 6, 15));
        assert_eq!(parse_sale_date("2021-06-15").unwrap(), (2021, 6, 15));
        for bad in ["2021-06", "2021-06-15-10", "yesterday", ""] {
            assert!(parse_sale_date(bad).is_err(), "timestamp {bad:?}");
        }
    }

    #[tokio::test]
    async fn test_aggregation_counts_repeats() {
        let mut warehouse = MemoryWarehouse::new();
        // Three identical (date, product, member) rows plus one stray.
        let rows = vec![
            sale("2021-06-15 10:00:00", "10", "1", "5"),
            sale("2021-06-15 11:30:00", "10", "1", "5"),
            sale("2021-06-15 12:45:00", "10", "1", "5"),
            sale("2021-06-15 13:00:00", "11", "1", "8"),
        ];

        let agg = aggregate_sales(rows, &mut warehouse).await.unwrap();

        assert_eq!(agg.rows_read, 4);
        assert_eq!(agg.groups.len(), 2);
        let quantities: Vec<i64> = agg.groups.values().map(|g| g.quantity).collect();
        assert_eq!(quantities, vec![3, 1]);
        // Same calendar date: one time row, shared by both groups.
        assert_eq!(warehouse.time_rows.len(), 1);
        assert_eq!(warehouse.time_rows[0].quarter, 2);
    }

    #[tokio::test]
    async fn test_aggregation_price_comes_from_first_row() {
        let mut warehouse = MemoryWarehouse::new();
        let rows = vec![
            sale("2021-06-15 10:00:00", "10", "1", "5"),
            sale("2021-06-15 11:00:00", "10", "1", "7"),
        ];

        let agg = aggregate_sales(rows, &mut warehouse).await.unwrap();

        let group = agg.groups.values().next().unwrap();
        assert_eq!(group.price, 5);
        assert_eq!(group.quantity, 2);
    }

    #[tokio::test]
    async fn test_bad_timestamp_is_fatal() {
        let mut warehouse = MemoryWarehouse::new();
        let rows = vec![sale("not a date", "10", "1", "5")];

        let err = aggregate_sales(rows, &mut warehouse).await.unwrap_err();
        assert!(matches!(
            err,
            EtlError::Transform {
                source: TransformError::BadTimestamp { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_link_facts_resolves_keys() {
        let mut warehouse = MemoryWarehouse::new();
        let rows = vec![
            sale("2021-06-15 10:00:00", "10", "1", "5"),
            sale("2021-06-15 11:00:00", "10", "1", "5"),
        ];
        let agg = aggregate_sales(rows, &mut warehouse).await.unwrap();

        let users = HashMap::from([("1".to_string(), user_entry(1, 7))]);
        let products = HashMap::from([("10".to_string(), product_entry("Beer", 3))]);

        let stats = link_facts(&agg.groups, &users, &products, &mut warehouse)
            .await
            .unwrap();

        assert_eq!(stats.facts_inserted, 1);
        assert_eq!(stats.orphans_dropped, 0);
        let fact = &warehouse.sale_rows[0];
        assert_eq!(fact.fk_user, 7);
        assert_eq!(fact.fk_product, 3);
        assert_eq!(fact.fk_time, 1);
        assert_eq!(fact.quantity, 2);
        assert_eq!(fact.price, 5);
    }

    #[tokio::test]
    async fn test_orphan_groups_are_dropped_silently() {
        let mut warehouse = MemoryWarehouse::new();
        let rows = vec![
            sale("2021-06-15 10:00:00", "10", "1", "5"),
            sale("2021-06-15 10:05:00", "99", "1", "5"),
            sale("2021-06-15 10:10:00", "10", "42", "5"),
        ];
        let agg = aggregate_sales(rows, &mut warehouse).await.unwrap();

        let users = HashMap::from([("1".to_string(), user_entry(1, 1))]);
        let products = HashMap::from([("10".to_string(), product_entry("Beer", 1))]);

        let stats = link_facts(&agg.groups, &users, &products, &mut warehouse)
            .await
            .unwrap();

        // Unknown product 99 and unknown member 42 drop; one group survives.
        assert_eq!(stats.facts_inserted, 1);
        assert_eq!(stats.orphans_dropped, 2);
        assert_eq!(warehouse.sale_rows.len(), 1);
    }
}
