//! Reservations repository for database operations
//!
//! Coordinated writes run in one transaction and lock the rows they depend
//! on (`FOR UPDATE`), so concurrent processes sharing the database serialize
//! per book and per reader. Dropping the transaction rolls everything back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};
use uuid::Uuid;

use super::{is_unique_violation, CreateGuard, ReservationStore};
use crate::{
    error::{AppError, AppResult},
    models::{Reservation, ReservationState},
};

static OPEN_STATES: [&str; 2] = ["issued", "extended"];

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn insert_in(
        tx: &mut Transaction<'_, Postgres>,
        reservation: &Reservation,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, reader_id, book_id, issue_date, return_date, state, extended, closed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.reader_id)
        .bind(reservation.book_id)
        .bind(reservation.issue_date)
        .bind(reservation.return_date)
        .bind(reservation.state)
        .bind(reservation.extended)
        .bind(reservation.closed_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Reservation {} collides with an existing one",
                    reservation.id
                ))
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for ReservationsRepository {
    async fn get(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(reservation)
    }

    async fn list_by_reader(&self, reader_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE reader_id = $1 ORDER BY issue_date",
        )
        .bind(reader_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn list_open_by_reader(&self, reader_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE reader_id = $1 AND state = ANY($2) ORDER BY issue_date",
        )
        .bind(reader_id)
        .bind(&OPEN_STATES[..])
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE book_id = $1 ORDER BY issue_date",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn list_open_by_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE book_id = $1 AND state = ANY($2) ORDER BY issue_date",
        )
        .bind(book_id)
        .bind(&OPEN_STATES[..])
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn has_borrowed(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reservations WHERE reader_id = $1 AND book_id = $2)",
        )
        .bind(reader_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(&self, reservation: &Reservation) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_in(&mut tx, reservation).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit_create(&self, guard: &CreateGuard, reservation: &Reservation) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Reader row first, then book row: the same order everywhere
        let reader_locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM readers WHERE id = $1 FOR UPDATE")
                .bind(guard.reader_id)
                .fetch_optional(&mut *tx)
                .await?;
        if reader_locked.is_none() {
            return Err(AppError::Conflict(format!("Reader {} disappeared", guard.reader_id)));
        }

        let book_row: Option<(i64, i32)> = sqlx::query_as(
            "SELECT version, copies_available FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(guard.book_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (version, copies_available) = book_row
            .ok_or_else(|| AppError::Conflict(format!("Book {} disappeared", guard.book_id)))?;
        if version != guard.book_version || copies_available <= 0 {
            return Err(AppError::Conflict(format!(
                "Book {} changed (version {} != {})",
                guard.book_id, version, guard.book_version
            )));
        }

        let open_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE reader_id = $1 AND state = ANY($2)",
        )
        .bind(guard.reader_id)
        .bind(&OPEN_STATES[..])
        .fetch_one(&mut *tx)
        .await?;
        if open_count as usize != guard.reader_open_count {
            return Err(AppError::Conflict(format!(
                "Reader {} open reservations changed ({} != {})",
                guard.reader_id, open_count, guard.reader_open_count
            )));
        }

        sqlx::query(
            "UPDATE books SET copies_available = copies_available - 1, version = version + 1 WHERE id = $1",
        )
        .bind(guard.book_id)
        .execute(&mut *tx)
        .await?;

        Self::insert_in(&mut tx, reservation).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit_extend(&self, reservation: &Reservation) -> AppResult<()> {
        let rows = sqlx::query(
            r#"
            UPDATE reservations
            SET return_date = $1, state = $2, extended = TRUE
            WHERE id = $3 AND extended = FALSE AND state = ANY($4)
            "#,
        )
        .bind(reservation.return_date)
        .bind(ReservationState::Extended)
        .bind(reservation.id)
        .bind(&OPEN_STATES[..])
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::Conflict(format!(
                "Reservation {} changed since it was read",
                reservation.id
            )));
        }
        Ok(())
    }

    async fn close(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET state = $1, closed_at = $2
            WHERE id = $3 AND state <> $1
            RETURNING *
            "#,
        )
        .bind(ReservationState::Closed)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Reservation {} already closed", id)))?;

        sqlx::query(
            r#"
            UPDATE books
            SET copies_available = LEAST(copies_available + 1, copies_total), version = version + 1
            WHERE id = $1
            "#,
        )
        .bind(closed.book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(closed)
    }
}
