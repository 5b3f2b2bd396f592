//! Data models for Biblio

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

/// Stores an enum as its `as_str()` text in a PostgreSQL `TEXT` column.
/// The enum must implement `FromStr<Err = String>`.
macro_rules! text_enum_sqlx {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub mod book;
pub mod copy;
pub mod ids;
pub mod loan;
pub mod notification;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookWithAvailability};
pub use copy::{BookCopy, CopyStatus};
pub use loan::{Loan, LoanStatus, LoanView};
pub use notification::{Notification, NotificationType};
pub use user::{Role, User, UserClaims};

/// 1-based page number from a query value
pub fn page_number(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Page size from a query value, between 1 and 100
pub fn page_size(per_page: Option<i64>) -> i64 {
    per_page.unwrap_or(20).clamp(1, 100)
}

/// Rows to skip; saturates so huge page numbers yield an empty page.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page - 1).saturating_mul(per_page)
}

/// Parse either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

/// Serde helper for optional request dates accepting both formats of [`parse_datetime`].
pub fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn page_offset_saturates_on_huge_pages() {
        let page = page_number(Some(i64::MAX));
        assert_eq!(page, i64::MAX);
        assert_eq!(page_offset(page, page_size(Some(100))), i64::MAX);
        assert_eq!(page_offset(page_number(Some(-5)), page_size(None)), 0);
    }

    #[test]
    fn parses_plain_dates_as_midnight_utc() {
        let parsed = parse_datetime("2024-01-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_datetime("2024-06-01T12:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("next tuesday").is_none());
    }
}
