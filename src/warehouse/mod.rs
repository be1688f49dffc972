//! Dimension and fact table abstractions over the backing store.
//!
//! The store sees only dimension attributes and resolved facts; natural keys
//! from the source files never reach it. `ensure_*` is an idempotent
//! upsert-by-natural-key with a run-duration cache, `insert_sale` is an
//! unconditional append.

pub mod memory;
pub mod postgres;

pub use memory::MemoryWarehouse;
pub use postgres::PostgresWarehouse;

use crate::error::WarehouseError;
use crate::model::{ProductRecord, SaleFact, SurrogateKey, TimeRecord, UserRecord};

/// The star-schema store a run writes into.
///
/// One implementation per backend; the pipeline is generic over this trait so
/// tests can run against [`MemoryWarehouse`] without a database.
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    /// Ensure a time row exists, deduplicated on (year, month, day).
    async fn ensure_time(&mut self, record: &TimeRecord) -> Result<SurrogateKey, WarehouseError>;

    /// Ensure a product row exists, deduplicated on its full attribute tuple.
    async fn ensure_product(
        &mut self,
        record: &ProductRecord,
    ) -> Result<SurrogateKey, WarehouseError>;

    /// Ensure a user row exists, deduplicated on `member_id`.
    async fn ensure_user(&mut self, record: &UserRecord) -> Result<SurrogateKey, WarehouseError>;

    /// Append one fact row; no dedup.
    async fn insert_sale(&mut self, fact: &SaleFact) -> Result<(), WarehouseError>;

    /// Commit the whole batch. Nothing is visible before this succeeds.
    async fn commit(&mut self) -> Result<(), WarehouseError>;
}
