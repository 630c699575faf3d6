//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Scarcity class of a title. Rare and unique books are never extendable;
/// a unique book owns exactly one copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Unique,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Unique => "unique",
        }
    }

    pub fn is_extendable(&self) -> bool {
        matches!(self, Rarity::Common)
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Rarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "common" => Ok(Rarity::Common),
            "rare" => Ok(Rarity::Rare),
            "unique" => Ok(Rarity::Unique),
            _ => Err(format!("Invalid rarity: {}", s)),
        }
    }
}

// SQLx conversion for Rarity (stored as text)
impl sqlx::Type<Postgres> for Rarity {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Rarity {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Rarity {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Book record as owned by the catalog
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub publishing_year: Option<i32>,
    pub language: Option<String>,
    pub rarity: Rarity,
    /// Minimum reader age
    pub age_limit: i32,
    pub copies_total: i32,
    pub copies_available: i32,
    /// Bumped on every copy-counter change; commits compare it to detect
    /// concurrent writers.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn has_available_copy(&self) -> bool {
        self.copies_available > 0
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_unique_copies"))]
pub struct NewBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub publishing_year: Option<i32>,
    pub language: Option<String>,
    pub rarity: Rarity,
    #[validate(range(min = 0, max = 21, message = "Age limit must be between 0 and 21"))]
    pub age_limit: i32,
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub copies_total: i32,
}

fn validate_unique_copies(book: &NewBook) -> Result<(), ValidationError> {
    if book.rarity == Rarity::Unique && book.copies_total != 1 {
        let mut err = ValidationError::new("unique_copies");
        err.message = Some("A unique book has exactly one copy".into());
        return Err(err);
    }
    Ok(())
}

impl NewBook {
    pub fn into_book(self, now: DateTime<Utc>) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            genre: self.genre,
            publishing_year: self.publishing_year,
            language: self.language,
            rarity: self.rarity,
            age_limit: self.age_limit,
            copies_total: self.copies_total,
            copies_available: self.copies_total,
            version: 0,
            created_at: now,
        }
    }
}

/// Catalog listing filter. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    pub genre: Option<String>,
    pub rarity: Option<Rarity>,
    /// Only books a reader of this age may borrow
    pub max_age_limit: Option<i32>,
    pub available_only: bool,
}

impl BookQuery {
    pub fn matches(&self, book: &Book) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_ref()
                .map(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
                .unwrap_or(true)
        };

        contains(&book.title, &self.title)
            && contains(&book.author, &self.author)
            && self
                .genre
                .as_ref()
                .map(|g| book.genre.as_deref().map(|bg| bg.eq_ignore_ascii_case(g)).unwrap_or(false))
                .unwrap_or(true)
            && self.rarity.map(|r| r == book.rarity).unwrap_or(true)
            && self.max_age_limit.map(|age| book.age_limit <= age).unwrap_or(true)
            && (!self.available_only || book.has_available_copy())
    }
}
