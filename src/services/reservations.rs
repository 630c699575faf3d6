//! Reservation engine: create, extend and close reservations
//!
//! Every mutating operation runs under the per-entity locks of the reader and
//! the book it touches, reads a fresh snapshot, evaluates the eligibility
//! rules and commits with a guarded write. A write conflict re-runs the whole
//! evaluation, up to `lending.max_attempts` times.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::{
    eligibility::{self, CreateSnapshot, ExtendSnapshot},
    locks::EntityLocks,
};
use crate::{
    clock::Clock,
    config::LendingConfig,
    error::{AppError, AppResult, Denial},
    models::{Rarity, Reservation},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    config: Arc<LendingConfig>,
    clock: Arc<dyn Clock>,
    locks: EntityLocks,
}

impl ReservationsService {
    pub fn new(
        repository: Repository,
        config: Arc<LendingConfig>,
        clock: Arc<dyn Clock>,
        locks: EntityLocks,
    ) -> Self {
        Self {
            repository,
            config,
            clock,
            locks,
        }
    }

    fn attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Run `operation` under the configured request deadline, if any
    async fn with_deadline<T, F>(&self, operation: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match self.config.request_timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), operation)
                .await
                .map_err(|_| AppError::Timeout(ms))?,
            None => operation.await,
        }
    }

    /// Reserve a copy of `book_id` for `reader_id`
    pub async fn create_reservation(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<Reservation> {
        self.with_deadline(self.create_locked(reader_id, book_id)).await
    }

    async fn create_locked(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<Reservation> {
        let _guard = self.locks.lock(&[reader_id, book_id]).await;

        for attempt in 1..=self.attempts() {
            let now = self.clock.now();
            let snapshot = self.create_snapshot(reader_id, book_id).await?;

            let guard = eligibility::check_create(&snapshot, &self.config, now).map_err(|denial| {
                tracing::debug!(
                    "Reservation of book {} by reader {} denied: {}",
                    book_id,
                    reader_id,
                    denial
                );
                denial
            })?;

            let reservation =
                Reservation::issue(reader_id, book_id, self.config.loan_period_days, now)?;
            match self
                .repository
                .reservations
                .commit_create(&guard, &reservation)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        "Reservation {} created: reader {} book {} due {}",
                        reservation.id,
                        reader_id,
                        book_id,
                        reservation.return_date
                    );
                    return Ok(reservation);
                }
                Err(AppError::Conflict(msg)) => {
                    tracing::warn!(
                        "Create conflict on attempt {}/{}: {}",
                        attempt,
                        self.attempts(),
                        msg
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Unavailable(format!(
            "Reservation of book {} still conflicting after {} attempts",
            book_id,
            self.attempts()
        )))
    }

    async fn create_snapshot(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<CreateSnapshot> {
        let reader = self.repository.readers.get(reader_id).await?;
        if reader.is_none() {
            return Ok(CreateSnapshot {
                reader,
                reader_open: Vec::new(),
                card: None,
                book: None,
                book_open: Vec::new(),
            });
        }

        let reader_open = self.repository.reservations.list_open_by_reader(reader_id).await?;
        let card = self.repository.lib_cards.get_by_reader(reader_id).await?;
        let book = self.repository.books.get(book_id).await?;
        let book_open = match &book {
            Some(book) if book.rarity == Rarity::Unique => {
                self.repository.reservations.list_open_by_book(book_id).await?
            }
            _ => Vec::new(),
        };

        Ok(CreateSnapshot {
            reader,
            reader_open,
            card,
            book,
            book_open,
        })
    }

    /// Push the return date of an open reservation by `extension_days`
    pub async fn extend_reservation(
        &self,
        reservation_id: Uuid,
        extension_days: u32,
    ) -> AppResult<Reservation> {
        if extension_days == 0 || extension_days > self.config.max_extension_days {
            return Err(AppError::Validation(format!(
                "Extension must be between 1 and {} days",
                self.config.max_extension_days
            )));
        }
        self.with_deadline(self.extend_locked(reservation_id, extension_days))
            .await
    }

    async fn extend_locked(&self, reservation_id: Uuid, extension_days: u32) -> AppResult<Reservation> {
        let (reader_id, book_id) = self.parties(reservation_id).await?;
        let _guard = self.locks.lock(&[reader_id, book_id]).await;

        for attempt in 1..=self.attempts() {
            let now = self.clock.now();
            let snapshot = self.extend_snapshot(reservation_id).await?;

            let approved = eligibility::check_extend(&snapshot, now).map_err(|denial| {
                tracing::debug!("Extension of reservation {} denied: {}", reservation_id, denial);
                denial
            })?;
            let extended = approved.extended_by(extension_days)?;

            match self.repository.reservations.commit_extend(&extended).await {
                Ok(()) => {
                    tracing::info!(
                        "Reservation {} extended by {} days, due {}",
                        reservation_id,
                        extension_days,
                        extended.return_date
                    );
                    return Ok(extended);
                }
                Err(AppError::Conflict(msg)) => {
                    tracing::warn!(
                        "Extend conflict on attempt {}/{}: {}",
                        attempt,
                        self.attempts(),
                        msg
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Unavailable(format!(
            "Extension of reservation {} still conflicting after {} attempts",
            reservation_id,
            self.attempts()
        )))
    }

    async fn extend_snapshot(&self, reservation_id: Uuid) -> AppResult<ExtendSnapshot> {
        let reservation = match self.repository.reservations.get(reservation_id).await? {
            Some(reservation) => reservation,
            None => {
                return Ok(ExtendSnapshot {
                    reservation: None,
                    card: None,
                    reader_open: Vec::new(),
                    book: None,
                })
            }
        };

        let card = self.repository.lib_cards.get_by_reader(reservation.reader_id).await?;
        let reader_open = self
            .repository
            .reservations
            .list_open_by_reader(reservation.reader_id)
            .await?;
        let book = self.repository.books.get(reservation.book_id).await?;

        Ok(ExtendSnapshot {
            reservation: Some(reservation),
            card,
            reader_open,
            book,
        })
    }

    /// Return the book: close the reservation and give the copy back
    pub async fn close_reservation(&self, reservation_id: Uuid) -> AppResult<Reservation> {
        self.with_deadline(self.close_locked(reservation_id)).await
    }

    async fn close_locked(&self, reservation_id: Uuid) -> AppResult<Reservation> {
        let (reader_id, book_id) = self.parties(reservation_id).await?;
        let _guard = self.locks.lock(&[reader_id, book_id]).await;

        for attempt in 1..=self.attempts() {
            let reservation = self
                .repository
                .reservations
                .get(reservation_id)
                .await?
                .ok_or(Denial::ReservationNotFound)?;
            if reservation.is_closed() {
                return Err(Denial::ReservationClosed.into());
            }

            let now = self.clock.now();
            match self.repository.reservations.close(reservation_id, now).await {
                Ok(closed) => {
                    tracing::info!(
                        "Reservation {} closed, copy of book {} returned",
                        reservation_id,
                        book_id
                    );
                    return Ok(closed);
                }
                Err(AppError::Conflict(msg)) => {
                    tracing::warn!(
                        "Close conflict on attempt {}/{}: {}",
                        attempt,
                        self.attempts(),
                        msg
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Unavailable(format!(
            "Closing reservation {} still conflicting after {} attempts",
            reservation_id,
            self.attempts()
        )))
    }

    /// Reader and book of a reservation, read before taking their locks
    async fn parties(&self, reservation_id: Uuid) -> AppResult<(Uuid, Uuid)> {
        let reservation = self
            .repository
            .reservations
            .get(reservation_id)
            .await?
            .ok_or(Denial::ReservationNotFound)?;
        Ok((reservation.reader_id, reservation.book_id))
    }

    /// Get a reservation with its effective state
    pub async fn get_reservation(&self, reservation_id: Uuid) -> AppResult<Reservation> {
        let reservation = self
            .repository
            .reservations
            .get(reservation_id)
            .await?
            .ok_or(Denial::ReservationNotFound)?;
        Ok(reservation.observed(self.clock.now()))
    }

    /// Every reservation of a reader, oldest first
    pub async fn reservations_for_reader(&self, reader_id: Uuid) -> AppResult<Vec<Reservation>> {
        self.repository
            .readers
            .get(reader_id)
            .await?
            .ok_or(Denial::ReaderNotFound)?;

        let now = self.clock.now();
        let reservations = self.repository.reservations.list_by_reader(reader_id).await?;
        Ok(reservations.into_iter().map(|r| r.observed(now)).collect())
    }

    /// Every reservation of a book, oldest first
    pub async fn reservations_for_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        self.repository
            .books
            .get(book_id)
            .await?
            .ok_or(Denial::BookNotFound)?;

        let now = self.clock.now();
        let reservations = self.repository.reservations.list_by_book(book_id).await?;
        Ok(reservations.into_iter().map(|r| r.observed(now)).collect())
    }
}
