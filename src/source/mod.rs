//! CSV row sources for the three flat extracts.
//!
//! Each extract is exposed as a lazy iterator of typed rows. Fields stay as
//! strings here; numeric parsing (and its fatal errors) belongs to the
//! transform stage.

use csv::Trim;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use snafu::prelude::*;
use std::fs::File;
use std::marker::PhantomData;
use std::path::Path;

use crate::error::{DeserializeSnafu, OpenSnafu, SourceError};

/// One row of `member.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberRow {
    pub id: String,
    pub gender: String,
    pub year: String,
}

/// One row of `product.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub alcohol_content_ml: String,
    pub price: String,
}

/// One row of `sale.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleRow {
    /// `YYYY-MM-DD HH:MM:SS...`; only the date portion is used.
    pub timestamp: String,
    pub product_id: String,
    pub member_id: String,
    pub price: String,
}

/// A delimited text file yielding one typed row per record.
pub struct CsvSource<T> {
    reader: csv::Reader<File>,
    path: String,
    _row: PhantomData<T>,
}

impl<T: DeserializeOwned> CsvSource<T> {
    /// Open an extract with the configured delimiter.
    pub fn open(path: impl AsRef<Path>, delimiter: u8) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .from_path(path)
            .context(OpenSnafu {
                path: path.display().to_string(),
            })?;

        Ok(Self {
            reader,
            path: path.display().to_string(),
            _row: PhantomData,
        })
    }

    /// Lazily deserialize rows; any malformed row is fatal to the run.
    pub fn rows(&mut self) -> impl Iterator<Item = Result<T, SourceError>> + '_ {
        let path = self.path.clone();
        self.reader
            .deserialize()
            .map(move |row| row.context(DeserializeSnafu { path: path.clone() }))
    }
}
