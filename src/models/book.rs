//! Book (catalog title) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Catalog title
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Book with its copy counters, as returned by list and detail endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookWithAvailability {
    #[serde(flatten)]
    pub book: Book,
    pub total_copies: i64,
    pub available_copies: i64,
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive match on title or author
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn page(&self) -> i64 {
        super::page_number(self.page)
    }

    pub fn per_page(&self) -> i64 {
        super::page_size(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        super::page_offset(self.page(), self.per_page())
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    /// Number of AVAILABLE copies to create with the book
    #[validate(range(max = 100, message = "At most 100 copies can be created at once"))]
    pub copies: Option<u32>,
}

/// Update book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub description: Option<String>,
}

impl UpdateBook {
    /// Apply the provided fields onto `book`
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if self.isbn.is_some() {
            book.isbn = self.isbn;
        }
        if self.published_year.is_some() {
            book.published_year = self.published_year;
        }
        if self.description.is_some() {
            book.description = self.description;
        }
    }
}
