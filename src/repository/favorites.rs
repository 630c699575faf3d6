//! Favorites repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{is_unique_violation, FavoriteStore};
use crate::{
    error::{AppError, AppResult},
    models::FavoriteBook,
};

#[derive(Clone)]
pub struct FavoritesRepository {
    pool: Pool<Postgres>,
}

impl FavoritesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoriteStore for FavoritesRepository {
    async fn insert(&self, favorite: &FavoriteBook) -> AppResult<()> {
        sqlx::query("INSERT INTO favorites (reader_id, book_id, added_at) VALUES ($1, $2, $3)")
            .bind(favorite.reader_id)
            .bind(favorite.book_id)
            .bind(favorite.added_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!(
                        "Book {} already a favorite of reader {}",
                        favorite.book_id, favorite.reader_id
                    ))
                } else {
                    AppError::Database(e)
                }
            })?;

        Ok(())
    }

    async fn contains(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE reader_id = $1 AND book_id = $2)",
        )
        .bind(reader_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_by_reader(&self, reader_id: Uuid) -> AppResult<Vec<FavoriteBook>> {
        let favorites = sqlx::query_as::<_, FavoriteBook>(
            "SELECT reader_id, book_id, added_at FROM favorites WHERE reader_id = $1 ORDER BY added_at",
        )
        .bind(reader_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(favorites)
    }
}
