//! Rating model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub reader_id: Uuid,
    pub book_id: Uuid,
    pub review: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

/// Add rating request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRating {
    pub reader_id: Uuid,
    pub book_id: Uuid,
    pub score: i32,
    #[validate(length(max = 2000, message = "Review is limited to 2000 characters"))]
    pub review: String,
}

impl NewRating {
    pub fn score_in_range(&self) -> bool {
        (MIN_SCORE..=MAX_SCORE).contains(&self.score)
    }

    pub fn into_rating(self, now: DateTime<Utc>) -> Rating {
        Rating {
            id: Uuid::new_v4(),
            reader_id: self.reader_id,
            book_id: self.book_id,
            review: self.review,
            score: self.score,
            created_at: now,
        }
    }
}

/// Arithmetic mean of the scores, `None` for an empty set
pub fn average_score(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let total: i64 = ratings.iter().map(|r| r.score as i64).sum();
    Some(total as f64 / ratings.len() as f64)
}
