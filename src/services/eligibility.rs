//! Eligibility rules for creating and extending reservations
//!
//! Pure functions over a snapshot of the stores. Predicates run in a fixed
//! order and the first failing one decides the denial, so the same state
//! always produces the same answer.

use chrono::{DateTime, Utc};

use crate::{
    config::LendingConfig,
    error::Denial,
    models::{Book, LibCard, Rarity, Reader, Reservation},
    repository::CreateGuard,
};

/// State read before evaluating a create request
#[derive(Debug, Clone)]
pub struct CreateSnapshot {
    pub reader: Option<Reader>,
    /// Open reservations of the reader
    pub reader_open: Vec<Reservation>,
    pub card: Option<LibCard>,
    pub book: Option<Book>,
    /// Open reservations of the book; only loaded for unique books
    pub book_open: Vec<Reservation>,
}

/// State read before evaluating an extend request
#[derive(Debug, Clone)]
pub struct ExtendSnapshot {
    pub reservation: Option<Reservation>,
    pub card: Option<LibCard>,
    /// Open reservations of the reservation's reader
    pub reader_open: Vec<Reservation>,
    pub book: Option<Book>,
}

fn check_card(card: Option<&LibCard>, now: DateTime<Utc>) -> Result<(), Denial> {
    match card {
        None => Err(Denial::LibCardMissing),
        Some(card) if !card.is_valid(now) => Err(Denial::LibCardInvalid),
        Some(_) => Ok(()),
    }
}

/// Evaluate a create request. On approval, returns the guard the commit must
/// re-check.
pub fn check_create(
    snapshot: &CreateSnapshot,
    config: &LendingConfig,
    now: DateTime<Utc>,
) -> Result<CreateGuard, Denial> {
    let reader = snapshot.reader.as_ref().ok_or(Denial::ReaderNotFound)?;

    if snapshot.reader_open.iter().any(|r| r.is_overdue(now)) {
        return Err(Denial::ReaderHasOverdueBook);
    }

    if snapshot.reader_open.len() >= config.max_open_reservations as usize {
        return Err(Denial::ReservationLimitExceeded {
            limit: config.max_open_reservations,
        });
    }

    check_card(snapshot.card.as_ref(), now)?;

    let book = snapshot.book.as_ref().ok_or(Denial::BookNotFound)?;

    // An occupied unique copy is reported as such rather than as an empty
    // copy counter
    if book.rarity == Rarity::Unique && !snapshot.book_open.is_empty() {
        return Err(Denial::UniqueBookUnavailable);
    }

    if !book.has_available_copy() {
        return Err(Denial::NoCopiesAvailable);
    }

    if reader.age < book.age_limit {
        return Err(Denial::AgeRestricted {
            required: book.age_limit,
            age: reader.age,
        });
    }

    if snapshot.reader_open.iter().any(|r| r.book_id == book.id) {
        return Err(Denial::DuplicateReservation);
    }

    Ok(CreateGuard {
        reader_id: reader.id,
        book_id: book.id,
        book_version: book.version,
        reader_open_count: snapshot.reader_open.len(),
    })
}

/// Evaluate an extend request. On approval, returns the reservation to extend.
pub fn check_extend(snapshot: &ExtendSnapshot, now: DateTime<Utc>) -> Result<&Reservation, Denial> {
    let reservation = snapshot
        .reservation
        .as_ref()
        .ok_or(Denial::ReservationNotFound)?;

    if reservation.is_closed() {
        return Err(Denial::ReservationClosed);
    }

    // An expired loan has to be returned, not extended
    if reservation.is_past_due(now) {
        return Err(Denial::ReservationExpired);
    }

    if reservation.extended {
        return Err(Denial::AlreadyExtended);
    }

    check_card(snapshot.card.as_ref(), now)?;

    if snapshot
        .reader_open
        .iter()
        .any(|r| r.id != reservation.id && r.is_overdue(now))
    {
        return Err(Denial::ReaderHasOverdueBook);
    }

    let book = snapshot.book.as_ref().ok_or(Denial::BookNotFound)?;
    if !book.rarity.is_extendable() {
        return Err(Denial::RareBookNotExtendable);
    }

    Ok(reservation)
}
