//! Postgres warehouse backend over sqlx.
//!
//! The whole batch runs inside a single transaction: either every dimension
//! and fact row becomes visible at commit, or the transaction is dropped and
//! rolled back by the driver on any failure path.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use snafu::prelude::*;
use std::collections::HashMap;
use tracing::debug;

use crate::config::WarehouseConfig;
use crate::error::{
    AlreadyCommittedSnafu, CommitSnafu, ConnectSnafu, QuerySnafu, SchemaSnafu, WarehouseError,
};
use crate::model::{DateKey, ProductRecord, SaleFact, SurrogateKey, TimeRecord, UserRecord};
use crate::warehouse::Warehouse;

/// Star schema DDL; surrogate keys are serial columns.
const SCHEMA_DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS time_dim (
        time_id SERIAL PRIMARY KEY,
        year INTEGER NOT NULL,
        quarter INTEGER NOT NULL,
        month INTEGER NOT NULL,
        day INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS product_dim (
        product_id SERIAL PRIMARY KEY,
        product_name TEXT NOT NULL,
        alcohol_ml BIGINT NOT NULL,
        price BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS user_dim (
        user_id SERIAL PRIMARY KEY,
        member_id BIGINT NOT NULL,
        gender TEXT NOT NULL,
        year_joined INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sale_fact (
        fk_time INTEGER NOT NULL REFERENCES time_dim (time_id),
        fk_product INTEGER NOT NULL REFERENCES product_dim (product_id),
        fk_user INTEGER NOT NULL REFERENCES user_dim (user_id),
        price BIGINT NOT NULL,
        quantity BIGINT NOT NULL
    )",
];

/// Postgres-backed warehouse holding the run's single transaction.
pub struct PostgresWarehouse {
    tx: Option<Transaction<'static, Postgres>>,

    time_cache: HashMap<DateKey, SurrogateKey>,
    product_cache: HashMap<ProductRecord, SurrogateKey>,
    user_cache: HashMap<i64, SurrogateKey>,
}

impl PostgresWarehouse {
    /// Connect, open the batch transaction and ensure the schema exists.
    pub async fn connect(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.user)
            .password(&config.password);

        // Single connection: the job is single-threaded and single-pass.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context(ConnectSnafu)?;

        let mut tx = pool.begin().await.context(ConnectSnafu)?;
        for ddl in SCHEMA_DDL {
            sqlx::query(ddl)
                .execute(&mut *tx)
                .await
                .context(SchemaSnafu)?;
        }
        debug!("Warehouse schema ensured, batch transaction open");

        Ok(Self {
            tx: Some(tx),
            time_cache: HashMap::new(),
            product_cache: HashMap::new(),
            user_cache: HashMap::new(),
        })
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, WarehouseError> {
        self.tx.as_mut().context(AlreadyCommittedSnafu)
    }
}

impl Warehouse for PostgresWarehouse {
    async fn ensure_time(&mut self, record: &TimeRecord) -> Result<SurrogateKey, WarehouseError> {
        let key = record.date_key();
        if let Some(&id) = self.time_cache.get(&key) {
            return Ok(id);
        }

        let tx = self.tx()?;
        let existing: Option<SurrogateKey> = sqlx::query_scalar(
            "SELECT time_id FROM time_dim WHERE year = $1 AND month = $2 AND day = $3",
        )
        .bind(record.year)
        .bind(record.month)
        .bind(record.day)
        .fetch_optional(&mut **tx)
        .await
        .context(QuerySnafu { table: "time_dim" })?;

        let id = match existing {
            Some(id) => id,
            None => sqlx::query_scalar(
                "INSERT INTO time_dim (year, quarter, month, day)
                 VALUES ($1, $2, $3, $4) RETURNING time_id",
            )
            .bind(record.year)
            .bind(record.quarter)
            .bind(record.month)
            .bind(record.day)
            .fetch_one(&mut **tx)
            .await
            .context(QuerySnafu { table: "time_dim" })?,
        };

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

        let tx = self.tx()?;
        let existing: Option<SurrogateKey> = sqlx::query_scalar(
            "SELECT product_id FROM product_dim
             WHERE product_name = $1 AND alcohol_ml = $2 AND price = $3",
        )
        .bind(&record.product_name)
        .bind(record.alcohol_ml)
        .bind(record.price)
        .fetch_optional(&mut **tx)
        .await
        .context(QuerySnafu {
            table: "product_dim",
        })?;

        let id = match existing {
            Some(id) => id,
            None => sqlx::query_scalar(
                "INSERT INTO product_dim (product_name, alcohol_ml, price)
                 VALUES ($1, $2, $3) RETURNING product_id",
            )
            .bind(&record.product_name)
            .bind(record.alcohol_ml)
            .bind(record.price)
            .fetch_one(&mut **tx)
            .await
            .context(QuerySnafu {
                table: "product_dim",
            })?,
        };

        self.product_cache.insert(record.clone(), id);
        Ok(id)
    }

    async fn ensure_user(&mut self, record: &UserRecord) -> Result<SurrogateKey, WarehouseError> {
        if let Some(&id) = self.user_cache.get(&record.member_id) {
            return Ok(id);
        }

        let tx = self.tx()?;
        let existing: Option<SurrogateKey> =
            sqlx::query_scalar("SELECT user_id FROM user_dim WHERE member_id = $1")
                .bind(record.member_id)
                .fetch_optional(&mut **tx)
                .await
                .context(QuerySnafu { table: "user_dim" })?;

        let id = match existing {
            Some(id) => id,
            None => sqlx::query_scalar(
                "INSERT INTO user_dim (member_id, gender, year_joined)
                 VALUES ($1, $2, $3) RETURNING user_id",
            )
            .bind(record.member_id)
            .bind(record.gender.as_str())
            .bind(record.year_joined)
            .fetch_one(&mut **tx)
            .await
            .context(QuerySnafu { table: "user_dim" })?,
        };

        self.user_cache.insert(record.member_id, id);
        Ok(id)
    }

    async fn insert_sale(&mut self, fact: &SaleFact) -> Result<(), WarehouseError> {
        let tx = self.tx()?;
        sqlx::query(
            "INSERT INTO sale_fact (fk_time, fk_product, fk_user, price, quantity)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(fact.fk_time)
        .bind(fact.fk_product)
        .bind(fact.fk_user)
        .bind(fact.price)
        .bind(fact.quantity)
        .execute(&mut **tx)
        .await
        .context(QuerySnafu { table: "sale_fact" })?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), WarehouseError> {
        let tx = self.tx.take().context(AlreadyCommittedSnafu)?;
        tx.commit().await.context(CommitSnafu)
    }
}
