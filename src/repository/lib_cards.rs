//! Library cards repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{is_unique_violation, LibCardStore};
use crate::{
    error::{AppError, AppResult},
    models::LibCard,
};

#[derive(Clone)]
pub struct LibCardsRepository {
    pool: Pool<Postgres>,
}

impl LibCardsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibCardStore for LibCardsRepository {
    async fn get_by_reader(&self, reader_id: Uuid) -> AppResult<Option<LibCard>> {
        let card = sqlx::query_as::<_, LibCard>("SELECT * FROM lib_cards WHERE reader_id = $1")
            .bind(reader_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    async fn insert(&self, card: &LibCard) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lib_cards (id, reader_id, number, issue_date, validity_days, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(card.id)
        .bind(card.reader_id)
        .bind(&card.number)
        .bind(card.issue_date)
        .bind(card.validity_days)
        .bind(card.active)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Reader {} already has a library card",
                    card.reader_id
                ))
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn update(&self, card: &LibCard) -> AppResult<()> {
        let rows = sqlx::query(
            "UPDATE lib_cards SET issue_date = $1, validity_days = $2, active = $3 WHERE id = $4",
        )
        .bind(card.issue_date)
        .bind(card.validity_days)
        .bind(card.active)
        .bind(card.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("Library card {} not found", card.id)));
        }
        Ok(())
    }
}
