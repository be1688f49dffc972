//! starforge: a batch loader for flat CSV extracts into a star schema.
//!
//! Reads three delimited extracts (members, products, sales), builds the
//! time, product and user dimensions with deduplicated surrogate keys,
//! aggregates repeated sale line items into quantity counts, and inserts
//! the resolved facts into a Postgres warehouse in a single transaction.
//!
//! # Example
//!
//! ```ignore
//! use starforge::{Config, error::EtlError, run_pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EtlError> {
//!     let config = Config::from_file("config.yaml")?;
//!     let stats = run_pipeline(config).await?;
//!     println!("Inserted {} fact rows", stats.facts_inserted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod transform;
pub mod warehouse;

// Re-export main types
pub use config::Config;
pub use pipeline::{RunStats, run_etl, run_pipeline};
pub use warehouse::{MemoryWarehouse, PostgresWarehouse, Warehouse};
