//! User and product dimension builders.
//!
//! Each builder maps raw rows to typed records, ensures every record in the
//! warehouse, and records the natural-key to surrogate-key mapping keyed by
//! the original string identifier. The fact linker resolves against these
//! dictionaries later; the raw identifiers themselves never reach the store.

use snafu::prelude::*;
use std::collections::HashMap;

use crate::error::{EtlError, SourceError, SourceSnafu, TransformSnafu, WarehouseSnafu};
use crate::model::{Gender, ProductRecord, SurrogateKey, UserRecord, parse_scaled_1000};
use crate::source::{MemberRow, ProductRow};
use crate::transform::parse_int;
use crate::warehouse::Warehouse;

/// A dimension record together with its warehouse-assigned key.
#[derive(Debug, Clone)]
pub struct DimensionEntry<R> {
    pub record: R,
    pub key: SurrogateKey,
}

/// Result of building one dimension: the lookup dictionary plus row count.
#[derive(Debug)]
pub struct DimensionBuild<R> {
    /// Natural key (raw source id string) to record and surrogate key.
    pub entries: HashMap<String, DimensionEntry<R>>,
    pub rows_read: u64,
}

/// Build the user dimension from member rows.
pub async fn build_user_dimension<W, I>(
    rows: I,
    warehouse: &mut W,
) -> Result<DimensionBuild<UserRecord>, EtlError>
where
    W: Warehouse,
    I: IntoIterator<Item = Result<MemberRow, SourceError>>,
{
    let mut entries = HashMap::new();
    let mut rows_read = 0u64;

    for row in rows {
        let row = row.context(SourceSnafu)?;
        rows_read += 1;

        let record = UserRecord {
            member_id: parse_int(&row.id, "id").context(TransformSnafu)?,
            gender: Gender::parse(&row.gender).context(TransformSnafu)?,
            year_joined: parse_int(&row.year, "year").context(TransformSnafu)?,
        };
        let key = warehouse.ensure_user(&record).await.context(WarehouseSnafu)?;
        entries.insert(row.id, DimensionEntry { record, key });
    }

    Ok(DimensionBuild { entries, rows_read })
}

/// Build the product dimension from product rows.
pub async fn build_product_dimension<W, I>(
    rows: I,
    warehouse: &mut W,
) -> Result<DimensionBuild<ProductRecord>, EtlError>
where
    W: Warehouse,
    I: IntoIterator<Item = Result<ProductRow, SourceError>>,
{
    let mut entries = HashMap::new();
    let mut rows_read = 0u64;

    for row in rows {
        let row = row.context(SourceSnafu)?;
        rows_read += 1;

        let record = ProductRecord {
            product_name: row.name,
            alcohol_ml: parse_scaled_1000(&row.alcohol_content_ml).context(TransformSnafu)?,
            price: parse_int(&row.price, "price").context(TransformSnafu)?,
        };
        let key = warehouse
            .ensure_product(&record)
            .await
            .context(WarehouseSnafu)?;
        entries.insert(row.id, DimensionEntry { record, key });
    }

    Ok(DimensionBuild { entries, rows_read })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::warehouse::MemoryWarehouse;

    fn member(id: &str, gender: &str, year: &str) -> Result<MemberRow, SourceError> {
        Ok(MemberRow {
            id: id.to_string(),
            gender: gender.to_string(),
            year: year.to_string(),
        })
    }

    fn product(id: &str, name: &str, alcohol: &str, price: &str) -> Result<ProductRow, SourceError> {
        Ok(ProductRow {
            id: id.to_string(),
            name: name.to_string(),
            alcohol_content_ml: alcohol.to_string(),
            price: price.to_string(),
        })
    }

    #[tokio::test]
    async fn test_build_user_dimension() {
        let mut warehouse = MemoryWarehouse::new();
        let rows = vec![member("1", "M", "2020"), member("2", "F", "2021")];

        let build = build_user_dimension(rows, &mut warehouse).await.unwrap();

        assert_eq!(build.rows_read, 2);
        assert_eq!(build.entries.len(), 2);
        assert_eq!(warehouse.user_rows.len(), 2);
        let entry = &build.entries["1"];
        assert_eq!(entry.record.gender, Gender::Male);
        assert_eq!(entry.record.year_joined, 2020);
    }

    #[tokio::test]
    async fn test_duplicate_member_rows_share_surrogate_key() {
        let mut warehouse = MemoryWarehouse::new();
        let rows = vec![member("1", "M", "2020"), member("1", "M", "2020")];

        let build = build_user_dimension(rows, &mut warehouse).await.unwrap();

        assert_eq!(build.rows_read, 2);
        assert_eq!(build.entries.len(), 1);
        assert_eq!(warehouse.user_rows.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_gender_aborts_build() {
        let mut warehouse = MemoryWarehouse::new();
        let rows = vec![member("1", "X", "2020")];

        let err = build_user_dimension(rows, &mut warehouse).await.unwrap_err();
        assert!(matches!(
            err,
            EtlError::Transform {
                source: TransformError::UnrecognizedGender { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_build_product_dimension_scales_alcohol() {
        let mut warehouse = MemoryWarehouse::new();
        let rows = vec![product("10", "Beer", "4.5", "5")];

        let build = build_product_dimension(rows, &mut warehouse).await.unwrap();

        let entry = &build.entries["10"];
        assert_eq!(entry.record.product_name, "Beer");
        assert_eq!(entry.record.alcohol_ml, 4500);
        assert_eq!(entry.record.price, 5);
        assert_eq!(warehouse.product_rows.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_product_price_is_fatal() {
        let mut warehouse = MemoryWarehouse::new();
        let rows = vec![product("10", "Beer", "4.5", "five")];

        let err = build_product_dimension(rows, &mut warehouse).await.unwrap_err();
        assert!(matches!(
            err,
            EtlError::Transform {
                source: TransformError::BadInt { field: "price", .. }
            }
        ));
    }
}
