//! Favorite book model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A book a reader marked as favorite, at most once per pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FavoriteBook {
    pub reader_id: Uuid,
    pub book_id: Uuid,
    pub added_at: DateTime<Utc>,
}
