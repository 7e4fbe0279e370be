use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use dukaan_core::cache::CacheStoreError;
use dukaan_core::signals::SignalStoreError;

pub mod cache;
pub mod signals;

pub use cache::SqlCacheStore;
pub use signals::SqlSignalStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for SignalStoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(source) => Self::Unavailable(source.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}

impl From<RepositoryError> for CacheStoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(source) => Self::Unavailable(source.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

/// Column text for timestamps: RFC 3339 with a `Z` suffix, so string
/// comparison in SQL matches chronological order.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{field} `{value}`: {e}")))
}

pub(crate) fn parse_decimal(value: &str, field: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value.trim())
        .map_err(|e| RepositoryError::Decode(format!("{field} `{value}`: {e}")))
}

pub(crate) fn parse_id(value: i64, field: &str) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|_| RepositoryError::Decode(format!("{field} `{value}` < 0")))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{parse_decimal, parse_id, parse_timestamp, timestamp, RepositoryError};
    use dukaan_core::signals::SignalStoreError;

    #[test]
    fn timestamps_round_trip_in_sortable_form() {
        let at = Utc.with_ymd_and_hms(2024, 10, 15, 10, 0, 0).unwrap();
        assert_eq!(timestamp(at), "2024-10-15T10:00:00Z");
        assert_eq!(parse_timestamp("2024-10-15T10:00:00Z", "at").expect("parse"), at);
        assert_eq!(parse_timestamp("2024-10-15T15:30:00+05:30", "at").expect("offset"), at);
    }

    #[test]
    fn malformed_columns_are_decode_errors() {
        assert!(matches!(parse_decimal("12,5", "price"), Err(RepositoryError::Decode(_))));
        assert!(matches!(parse_timestamp("yesterday", "at"), Err(RepositoryError::Decode(_))));
        assert!(matches!(parse_id(-1, "id"), Err(RepositoryError::Decode(_))));
        assert_eq!(parse_decimal(" 450.00 ", "price").expect("decimal"), Decimal::new(45000, 2));
    }

    #[test]
    fn decode_errors_stay_decode_errors_at_the_store_boundary() {
        let error: SignalStoreError = RepositoryError::Decode("tags_json".to_string()).into();
        assert_eq!(error, SignalStoreError::Decode("tags_json".to_string()));
    }
}
