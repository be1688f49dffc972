//! In-memory warehouse used by tests and dry inspection.
//!
//! Mirrors the dedup semantics of the Postgres backend exactly: same cache
//! keys, same surrogate key assignment order (1-based per table).

use std::collections::HashMap;

use crate::error::WarehouseError;
use crate::model::{DateKey, ProductRecord, SaleFact, SurrogateKey, TimeRecord, UserRecord};
use crate::warehouse::Warehouse;

/// Vec-backed star schema; surrogate key = row position + 1.
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    pub time_rows: Vec<TimeRecord>,
    pub product_rows: Vec<ProductRecord>,
    pub user_rows: Vec<UserRecord>,
    pub sale_rows: Vec<SaleFact>,
    committed: bool,

    time_cache: HashMap<DateKey, SurrogateKey>,
    product_cache: HashMap<ProductRecord, SurrogateKey>,
    user_cache: HashMap<i64, SurrogateKey>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `commit` has been called.
    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

impl Warehouse for MemoryWarehouse {
    async fn ensure_time(&mut self, record: &TimeRecord) -> Result<SurrogateKey, WarehouseError> {
        let key = record.date_key();
        if let Some(&id) = self.time_cache.get(&key) {
            return Ok(id);
        }
        self.time_rows.push(*record);
        let id = self.time_rows.len() as SurrogateKey;
        self.time_cache.insert(key, id);
        Ok(id)
    }

    async fn ensure_product(
        &mut self,
        record: &ProductRecord,
    ) -> Result<SurrogateKey, WarehouseError> {
        if let Some(&id) = self.product_cache.get(record) {
            return Ok(id);
        }
        self.product_rows.push(record.clone());
        let id = self.product_rows.len() as SurrogateKey;
        self.product_cache.insert(record.clone(), id);
        Ok(id)
    }

    async fn ensure_user(&mut self, record: &UserRecord) -> Result<SurrogateKey, WarehouseError> {
        if let Some(&id) = self.user_cache.get(&record.member_id) {
            return Ok(id);
        }
        self.user_rows.push(record.clone());
        let id = self.user_rows.len() as SurrogateKey;
        self.user_cache.insert(record.member_id, id);
        Ok(id)
    }

    async fn insert_sale(&mut self, fact: &SaleFact) -> Result<(), WarehouseError> {
        self.sale_rows.push(*fact);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), WarehouseError> {
        self.committed = true;
        Ok(())
    }
}
