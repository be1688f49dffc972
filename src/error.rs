//! Error types for starforge using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Warehouse host is empty.
    #[snafu(display("Warehouse host cannot be empty"))]
    EmptyHost,

    /// Warehouse database name is empty.
    #[snafu(display("Warehouse database name cannot be empty"))]
    EmptyDatabase,

    /// An input file path is empty.
    #[snafu(display("Input path for {input} cannot be empty"))]
    EmptyInputPath { input: &'static str },

    /// CSV delimiter is not a single-byte character.
    #[snafu(display("CSV delimiter {delimiter:?} must be a single ASCII character"))]
    BadDelimiter { delimiter: char },
}

// ============ Source Errors ============

/// Errors that can occur while reading CSV extracts.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// Failed to open a CSV extract.
    #[snafu(display("Failed to open CSV extract {path}"))]
    Open { path: String, source: csv::Error },

    /// A row could not be deserialized into the expected shape.
    #[snafu(display("Malformed row in {path}"))]
    Deserialize { path: String, source: csv::Error },
}

// ============ Transform Errors ============

/// Errors raised while mapping raw rows to typed dimension records.
///
/// All of these are fatal: a single bad field aborts the whole run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// Gender code outside the known M/F/U set.
    #[snafu(display("Unrecognized gender code {code:?}"))]
    UnrecognizedGender { code: String },

    /// A field that must be an integer was not.
    #[snafu(display("Invalid integer in field '{field}': {value:?}"))]
    BadInt {
        field: &'static str,
        value: String,
        source: std::num::ParseIntError,
    },

    /// A decimal field (alcohol content) could not be scaled.
    #[snafu(display("Invalid decimal value {value:?}"))]
    BadDecimal { value: String },

    /// Sale timestamp did not carry a YYYY-MM-DD date portion.
    #[snafu(display("Invalid sale timestamp {value:?}"))]
    BadTimestamp { value: String },
}

// ============ Warehouse Errors ============

/// Errors that can occur against the backing relational store.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WarehouseError {
    /// Failed to connect to the warehouse database.
    #[snafu(display("Failed to connect to warehouse database"))]
    Connect { source: sqlx::Error },

    /// Failed to create the star schema tables.
    #[snafu(display("Failed to create warehouse schema"))]
    Schema { source: sqlx::Error },

    /// A dimension or fact query failed.
    #[snafu(display("Query against {table} failed"))]
    Query {
        table: &'static str,
        source: sqlx::Error,
    },

    /// Failed to commit the batch transaction.
    #[snafu(display("Failed to commit warehouse transaction"))]
    Commit { source: sqlx::Error },

    /// The transaction was already committed (internal state error).
    #[snafu(display("Warehouse transaction already committed"))]
    AlreadyCommitted,
}

// ============ Etl Error (top-level) ============

/// Top-level errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EtlError {
    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// CSV source error.
    #[snafu(display("Source error"))]
    Source { source: SourceError },

    /// Row transformation error.
    #[snafu(display("Transform error"))]
    Transform { source: TransformError },

    /// Warehouse error.
    #[snafu(display("Warehouse error"))]
    Warehouse { source: WarehouseError },
}
