//! Typed records for the star schema.
//!
//! Dimension records carry only natural-key attributes and measures; surrogate
//! keys are assigned by the warehouse and travel separately (see
//! [`crate::transform::DimensionEntry`]).

use crate::error::{BadDecimalSnafu, TransformError, UnrecognizedGenderSnafu};
use snafu::prelude::*;
use std::fmt;

/// Warehouse-assigned surrogate key.
pub type SurrogateKey = i32;

/// Natural key of the time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey {
    pub year: i32,
    pub month: i32,
    pub day: i32,
}

/// Member gender as stored in `user_dim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Map a source gender code to the dimension value.
    ///
    /// Only `M`, `F` and `U` are recognized; anything else is fatal.
    pub fn parse(code: &str) -> Result<Self, TransformError> {
        match code {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            "U" => Ok(Gender::Unknown),
            other => UnrecognizedGenderSnafu { code: other }.fail(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `time_dim`, deduplicated on (year, month, day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRecord {
    pub year: i32,
    pub quarter: i32,
    pub month: i32,
    pub day: i32,
}

impl TimeRecord {
    /// Build a time record for a calendar date, deriving the quarter.
    pub fn from_date(year: i32, month: i32, day: i32) -> Self {
        Self {
            year,
            quarter: quarter_of(month),
            month,
            day,
        }
    }

    pub fn date_key(&self) -> DateKey {
        DateKey {
            year: self.year,
            month: self.month,
            day: self.day,
        }
    }
}

/// Quarter for a 1-based month: 1-3 -> 1, 4-6 -> 2, 7-9 -> 3, 10-12 -> 4.
pub fn quarter_of(month: i32) -> i32 {
    (month - 1) / 3 + 1
}

/// One row of `product_dim`.
///
/// The source product id is not an attribute here; it is only the in-memory
/// lookup key used later by the fact linker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductRecord {
    pub product_name: String,
    /// Alcohol content in thousandths (input decimal scaled by 1000).
    pub alcohol_ml: i64,
    pub price: i64,
}

/// One row of `user_dim`, deduplicated on `member_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserRecord {
    pub member_id: i64,
    pub gender: Gender,
    pub year_joined: i32,
}

/// One row of `sale_fact`: resolved foreign keys plus measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleFact {
    pub fk_time: SurrogateKey,
    pub fk_product: SurrogateKey,
    pub fk_user: SurrogateKey,
    pub price: i64,
    pub quantity: i64,
}

/// Scale a decimal string by 1000, truncating toward zero.
///
/// Works on the digit string directly so `"4.5"` becomes exactly `4500` with
/// no float round-trip; digits past the third fractional place are dropped.
pub fn parse_scaled_1000(value: &str) -> Result<i64, TransformError> {
    let trimmed = value.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };

    let valid = !digits.is_empty()
        && (!int_part.is_empty() || !frac_part.is_empty())
        && int_part.chars().all(|c| c.is_ascii_digit())
        && frac_part.chars().all(|c| c.is_ascii_digit());
    ensure!(valid, BadDecimalSnafu { value });

    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .ok()
            .context(BadDecimalSnafu { value })?
    };

    // Pad or truncate the fraction to exactly three digits.
    let mut frac = 0i64;
    for i in 0..3 {
        let digit = frac_part
            .as_bytes()
            .get(i)
            .map(|b| i64::from(b - b'0'))
            .unwrap_or(0);
        frac = frac * 10 + digit;
    }

    let magnitude = whole
        .checked_mul(1000)
        .and_then(|w| w.checked_add(frac))
        .context(BadDecimalSnafu { value })?;

    Ok(if negative { -magnitude } else { magnitude })
}
