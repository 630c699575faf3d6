//! Ratings repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{is_unique_violation, RatingStore};
use crate::{
    error::{AppError, AppResult},
    models::Rating,
};

#[derive(Clone)]
pub struct RatingsRepository {
    pool: Pool<Postgres>,
}

impl RatingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingStore for RatingsRepository {
    async fn get_for_pair(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<Option<Rating>> {
        let rating = sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE reader_id = $1 AND book_id = $2",
        )
        .bind(reader_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE book_id = $1 ORDER BY created_at",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn insert(&self, rating: &Rating) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (id, reader_id, book_id, review, score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(rating.id)
        .bind(rating.reader_id)
        .bind(rating.book_id)
        .bind(&rating.review)
        .bind(rating.score)
        .bind(rating.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Reader {} already rated book {}",
                    rating.reader_id, rating.book_id
                ))
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(())
    }
}
