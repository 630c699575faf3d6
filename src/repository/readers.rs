//! Readers repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{is_unique_violation, ReaderStore};
use crate::{
    error::{AppError, AppResult},
    models::Reader,
};

#[derive(Clone)]
pub struct ReadersRepository {
    pool: Pool<Postgres>,
}

impl ReadersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReaderStore for ReadersRepository {
    async fn get(&self, id: Uuid) -> AppResult<Option<Reader>> {
        let reader = sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reader)
    }

    async fn find_by_phone(&self, phone_number: &str) -> AppResult<Option<Reader>> {
        let reader = sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE phone_number = $1")
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reader)
    }

    async fn insert(&self, reader: &Reader) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO readers (id, fio, phone_number, age, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reader.id)
        .bind(&reader.fio)
        .bind(&reader.phone_number)
        .bind(reader.age)
        .bind(reader.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Phone number {} already registered",
                    reader.phone_number
                ))
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(())
    }
}
