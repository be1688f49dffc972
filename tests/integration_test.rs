//! Integration tests for starforge
//!
//! Drives the full ETL flow through `run_etl` against the in-memory
//! warehouse, with real CSV files on disk.

use std::fs;
use tempfile::TempDir;

use starforge::config::InputConfig;
use starforge::model::Gender;
use starforge::warehouse::MemoryWarehouse;
use starforge::{Config, run_etl};

fn write_extracts(dir: &TempDir, member: &str, product: &str, sale: &str) -> InputConfig {
    let member_path = dir.path().join("member.csv");
    let product_path = dir.path().join("product.csv");
    let sale_path = dir.path().join("sale.csv");
    fs::write(&member_path, member).unwrap();
    fs::write(&product_path, product).unwrap();
    fs::write(&sale_path, sale).unwrap();

    InputConfig {
        product: product_path,
        member: member_path,
        sale: sale_path,
        delimiter: ';',
    }
}

#[tokio::test]
async fn test_end_to_end_load() {
    let dir = TempDir::new().unwrap();
    let inputs = write_extracts(
        &dir,
        "id;gender;year\n1;M;2020\n",
        "id;name;alcohol_content_ml;price\n10;Beer;4.5;5\n",
        "timestamp;product_id;member_id;price\n\
         2021-06-15 10:00:00;10;1;5\n\
         2021-06-15 14:30:00;10;1;5\n",
    );

    let mut warehouse = MemoryWarehouse::new();
    let stats = run_etl(&inputs, &mut warehouse).await.unwrap();

    assert_eq!(stats.members_read, 1);
    assert_eq!(stats.products_read, 1);
    assert_eq!(stats.sales_read, 2);
    assert_eq!(stats.sale_groups, 1);
    assert_eq!(stats.facts_inserted, 1);
    assert_eq!(stats.orphans_dropped, 0);
    assert!(warehouse.is_committed());

    // One row per dimension.
    assert_eq!(warehouse.user_rows.len(), 1);
    assert_eq!(warehouse.product_rows.len(), 1);
    assert_eq!(warehouse.time_rows.len(), 1);

    let user = &warehouse.user_rows[0];
    assert_eq!(user.member_id, 1);
    assert_eq!(user.gender, Gender::Male);
    assert_eq!(user.year_joined, 2020);

    let product = &warehouse.product_rows[0];
    assert_eq!(product.product_name, "Beer");
    assert_eq!(product.alcohol_ml, 4500);
    assert_eq!(product.price, 5);

    let time = &warehouse.time_rows[0];
    assert_eq!((time.year, time.quarter, time.month, time.day), (2021, 2, 6, 15));

    // Both line items collapse into one fact with quantity 2.
    assert_eq!(warehouse.sale_rows.len(), 1);
    let fact = &warehouse.sale_rows[0];
    assert_eq!(fact.quantity, 2);
    assert_eq!(fact.price, 5);
    assert_eq!(fact.fk_time, 1);
    assert_eq!(fact.fk_product, 1);
    assert_eq!(fact.fk_user, 1);
}

#[tokio::test]
async fn test_orphan_sales_complete_without_error() {
    let dir = TempDir::new().unwrap();
    let inputs = write_extracts(
        &dir,
        "id;gender;year\n1;M;2020\n",
        "id;name;alcohol_content_ml;price\n10;Beer;4.5;5\n",
        "timestamp;product_id;member_id;price\n\
         2021-06-15 10:00:00;10;1;5\n\
         2021-06-15 10:05:00;99;1;5\n\
         2021-06-16 09:00:00;10;42;5\n",
    );

    let mut warehouse = MemoryWarehouse::new();
    let stats = run_etl(&inputs, &mut warehouse).await.unwrap();

    assert_eq!(stats.sale_groups, 3);
    assert_eq!(stats.facts_inserted, 1);
    assert_eq!(stats.orphans_dropped, 2);
    assert_eq!(warehouse.sale_rows.len(), 1);
    assert!(warehouse.is_committed());
}

#[tokio::test]
async fn test_duplicate_dimension_rows_collapse() {
    let dir = TempDir::new().unwrap();
    let inputs = write_extracts(
        &dir,
        "id;gender;year\n1;M;2020\n1;M;2020\n2;F;2019\n",
        "id;name;alcohol_content_ml;price\n10;Beer;4.5;5\n11;Beer;4.5;5\n",
        "timestamp;product_id;member_id;price\n2021-01-02 08:00:00;10;2;5\n",
    );

    let mut warehouse = MemoryWarehouse::new();
    let stats = run_etl(&inputs, &mut warehouse).await.unwrap();

    // Member 1 appears twice but yields one user row; products 10 and 11
    // share every attribute, so the store holds a single product row while
    // both natural keys resolve to it.
    assert_eq!(stats.members_read, 3);
    assert_eq!(stats.users_built, 2);
    assert_eq!(warehouse.user_rows.len(), 2);
    assert_eq!(stats.products_built, 2);
    assert_eq!(warehouse.product_rows.len(), 1);

    assert_eq!(warehouse.time_rows[0].quarter, 1);
    assert_eq!(stats.facts_inserted, 1);
}

#[tokio::test]
async fn test_unknown_gender_aborts_before_commit() {
    let dir = TempDir::new().unwrap();
    let inputs = write_extracts(
        &dir,
        "id;gender;year\n1;X;2020\n",
        "id;name;alcohol_content_ml;price\n10;Beer;4.5;5\n",
        "timestamp;product_id;member_id;price\n2021-06-15 10:00:00;10;1;5\n",
    );

    let mut warehouse = MemoryWarehouse::new();
    let result = run_etl(&inputs, &mut warehouse).await;

    assert!(result.is_err());
    assert!(!warehouse.is_committed());
}

#[test]
fn test_config_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        r#"
warehouse:
  host: localhost
  dbname: fklubdw
  user: postgres
  password: dwpass

inputs:
  product: product.csv
  member: member.csv
  sale: sale.csv
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.warehouse.dbname, "fklubdw");
    assert_eq!(config.inputs.delimiter, ';');
}
