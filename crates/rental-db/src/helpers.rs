//! Row-to-entity parsing helpers.
//!
//! Every repo converts `libsql::Row` (column-indexed) into typed entity
//! structs. Timestamps are written as RFC 3339 with nanoseconds, so the audit
//! hash recomputed from a loaded row matches the one computed at write time.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::DatabaseError;

pub use rental_core::chain::format_timestamp;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Render a calendar date as stored in `jobs.start_date` / `jobs.end_date`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00.000000000Z"`) and `SQLite`'s
/// default format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a `YYYY-MM-DD` TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` for any other format.
pub fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| DatabaseError::Query(format!("Failed to parse date '{s}': {e}")))
}

/// Parse a decimal TEXT column (money).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string is not a decimal number.
pub fn parse_decimal(s: &str) -> Result<Decimal, DatabaseError> {
    Decimal::from_str(s)
        .map_err(|e| DatabaseError::Query(format!("Failed to parse decimal '{s}': {e}")))
}

/// Parse a nullable decimal TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string is not a decimal number.
pub fn parse_optional_decimal(s: Option<&str>) -> Result<Option<Decimal>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_decimal(s)?)),
        _ => Ok(None),
    }
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with every rental-core enum, whichever `rename_all` it uses.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Read an INTEGER 0/1 column as `bool`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_bool(row: &libsql::Row, idx: i32) -> Result<bool, DatabaseError> {
    Ok(row.get::<i64>(idx)? != 0)
}

/// Read a non-negative INTEGER column as `u32`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the stored value does not fit.
pub fn get_u32(row: &libsql::Row, idx: i32) -> Result<u32, DatabaseError> {
    let value = row.get::<i64>(idx)?;
    u32::try_from(value)
        .map_err(|_| DatabaseError::Query(format!("Column {idx} out of range for u32: {value}")))
}

/// Extract an optional JSON value from a TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string contains invalid JSON.
pub fn parse_optional_json(s: Option<&str>) -> Result<Option<serde_json::Value>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => {
            let val = serde_json::from_str(s)
                .map_err(|e| DatabaseError::Query(format!("Invalid JSON in column: {e}")))?;
            Ok(Some(val))
        }
        _ => Ok(None),
    }
}

/// Serialize a value for a JSON TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Other` if serialization fails.
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Other(e.into()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn datetime_roundtrip_keeps_nanoseconds() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(1);
        assert_eq!(parse_datetime(&format_timestamp(ts)).unwrap(), ts);
    }

    #[test]
    fn datetime_accepts_sqlite_format() {
        let ts = parse_datetime("2024-06-01 12:00:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn nanosecond_timestamps_sort_lexicographically() {
        let a = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let b = a + chrono::Duration::nanoseconds(500);
        assert!(format_timestamp(a) < format_timestamp(b));
    }

    #[test]
    fn date_and_decimal_parsing() {
        let d = parse_date("2024-01-11").unwrap();
        assert_eq!(format_date(d), "2024-01-11");
        assert!(parse_date("11/01/2024").is_err());
        assert_eq!(parse_decimal("135.00").unwrap(), Decimal::new(13500, 2));
        assert_eq!(parse_optional_decimal(None).unwrap(), None);
        assert!(parse_decimal("ten").is_err());
    }

    #[test]
    fn enum_parsing() {
        use rental_core::enums::{EventType, JobStatus};
        let status: JobStatus = parse_enum("in_progress").unwrap();
        assert_eq!(status, JobStatus::InProgress);
        let ev: EventType = parse_enum("RETENTION_CLEANUP").unwrap();
        assert_eq!(ev, EventType::RetentionCleanup);
        assert!(parse_enum::<JobStatus>("done").is_err());
    }
}
