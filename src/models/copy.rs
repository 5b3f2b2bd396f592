//! Copy (physical instance of a book) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Shelf status of a physical copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyStatus {
    Available,
    Borrowed,
    Maintenance,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "AVAILABLE",
            CopyStatus::Borrowed => "BORROWED",
            CopyStatus::Maintenance => "MAINTENANCE",
        }
    }

    /// Whether an administrator may move a copy from `self` to `to`.
    /// BORROWED is owned by the loan lifecycle and never set or cleared by hand.
    pub fn can_set_manually(&self, to: CopyStatus) -> bool {
        matches!(
            (self, to),
            (CopyStatus::Available, CopyStatus::Maintenance)
                | (CopyStatus::Maintenance, CopyStatus::Available)
                | (CopyStatus::Available, CopyStatus::Available)
                | (CopyStatus::Maintenance, CopyStatus::Maintenance)
        )
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CopyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AVAILABLE" => Ok(CopyStatus::Available),
            "BORROWED" => Ok(CopyStatus::Borrowed),
            "MAINTENANCE" => Ok(CopyStatus::Maintenance),
            _ => Err(format!("Invalid copy status: {}", s)),
        }
    }
}

text_enum_sqlx!(CopyStatus);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookCopy {
    pub id: String,
    pub book_id: String,
    pub status: CopyStatus,
    pub created_at: DateTime<Utc>,
}

impl BookCopy {
    pub fn new(book_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: super::ids::generate_id_at(now),
            book_id: book_id.to_string(),
            status: CopyStatus::Available,
            created_at: now,
        }
    }
}

/// Add copies request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateCopies {
    /// Number of copies to add (default 1)
    pub count: Option<u32>,
}

/// Change a copy's status (AVAILABLE or MAINTENANCE)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCopy {
    pub status: CopyStatus,
}
