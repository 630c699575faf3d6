//! In-memory backend
//!
//! Tables sit behind `parking_lot` locks that are never held across an
//! `.await`, so every method is a single critical section. Coordinated writes
//! take the books lock before the reservations lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    BookStore, CreateGuard, FavoriteStore, LibCardStore, RatingStore, ReaderStore, ReservationStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookQuery, FavoriteBook, LibCard, Rating, Reader, Reservation},
};

#[derive(Default)]
struct Tables {
    books: RwLock<HashMap<Uuid, Book>>,
    readers: RwLock<HashMap<Uuid, Reader>>,
    /// Keyed by reader id, one card per reader
    lib_cards: RwLock<HashMap<Uuid, LibCard>>,
    reservations: RwLock<HashMap<Uuid, Reservation>>,
    /// Keyed by (reader id, book id)
    ratings: RwLock<HashMap<(Uuid, Uuid), Rating>>,
    /// Keyed by (reader id, book id)
    favorites: RwLock<HashMap<(Uuid, Uuid), FavoriteBook>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_issue_date(mut reservations: Vec<Reservation>) -> Vec<Reservation> {
    reservations.sort_by_key(|r| r.issue_date);
    reservations
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.tables.books.read().get(&id).cloned())
    }

    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut books: Vec<Book> = self
            .tables
            .books
            .read()
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn insert(&self, book: &Book) -> AppResult<()> {
        let mut books = self.tables.books.write();
        if books.contains_key(&book.id) {
            return Err(AppError::Conflict(format!("Book {} already exists", book.id)));
        }
        books.insert(book.id, book.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.books.write().remove(&id).is_some())
    }
}

#[async_trait]
impl ReaderStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Reader>> {
        Ok(self.tables.readers.read().get(&id).cloned())
    }

    async fn find_by_phone(&self, phone_number: &str) -> AppResult<Option<Reader>> {
        Ok(self
            .tables
            .readers
            .read()
            .values()
            .find(|r| r.phone_number == phone_number)
            .cloned())
    }

    async fn insert(&self, reader: &Reader) -> AppResult<()> {
        let mut readers = self.tables.readers.write();
        if readers.values().any(|r| r.phone_number == reader.phone_number) {
            return Err(AppError::Conflict(format!(
                "Phone number {} already registered",
                reader.phone_number
            )));
        }
        readers.insert(reader.id, reader.clone());
        Ok(())
    }
}

#[async_trait]
impl LibCardStore for MemoryStore {
    async fn get_by_reader(&self, reader_id: Uuid) -> AppResult<Option<LibCard>> {
        Ok(self.tables.lib_cards.read().get(&reader_id).cloned())
    }

    async fn insert(&self, card: &LibCard) -> AppResult<()> {
        let mut cards = self.tables.lib_cards.write();
        if cards.contains_key(&card.reader_id) {
            return Err(AppError::Conflict(format!(
                "Reader {} already has a library card",
                card.reader_id
            )));
        }
        cards.insert(card.reader_id, card.clone());
        Ok(())
    }

    async fn update(&self, card: &LibCard) -> AppResult<()> {
        let mut cards = self.tables.lib_cards.write();
        match cards.get_mut(&card.reader_id) {
            Some(stored) if stored.id == card.id => {
                *stored = card.clone();
                Ok(())
            }
            _ => Err(AppError::NotFound(format!("Library card {} not found", card.id))),
        }
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        Ok(self.tables.reservations.read().get(&id).cloned())
    }

    async fn list_by_reader(&self, reader_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = self.tables.reservations.read();
        Ok(sorted_by_issue_date(
            reservations
                .values()
                .filter(|r| r.reader_id == reader_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_open_by_reader(&self, reader_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = self.tables.reservations.read();
        Ok(sorted_by_issue_date(
            reservations
                .values()
                .filter(|r| r.reader_id == reader_id && r.is_open())
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = self.tables.reservations.read();
        Ok(sorted_by_issue_date(
            reservations
                .values()
                .filter(|r| r.book_id == book_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_open_by_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = self.tables.reservations.read();
        Ok(sorted_by_issue_date(
            reservations
                .values()
                .filter(|r| r.book_id == book_id && r.is_open())
                .cloned()
                .collect(),
        ))
    }

    async fn has_borrowed(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<bool> {
        Ok(self
            .tables
            .reservations
            .read()
            .values()
            .any(|r| r.reader_id == reader_id && r.book_id == book_id))
    }

    async fn insert(&self, reservation: &Reservation) -> AppResult<()> {
        let mut reservations = self.tables.reservations.write();
        if reservations.contains_key(&reservation.id) {
            return Err(AppError::Conflict(format!(
                "Reservation {} already exists",
                reservation.id
            )));
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn commit_create(&self, guard: &CreateGuard, reservation: &Reservation) -> AppResult<()> {
        let mut books = self.tables.books.write();
        let mut reservations = self.tables.reservations.write();

        let book = books
            .get_mut(&guard.book_id)
            .ok_or_else(|| AppError::Conflict(format!("Book {} disappeared", guard.book_id)))?;
        if book.version != guard.book_version {
            return Err(AppError::Conflict(format!(
                "Book {} changed (version {} != {})",
                book.id, book.version, guard.book_version
            )));
        }
        if book.copies_available <= 0 {
            return Err(AppError::Conflict(format!("Book {} has no copy left", book.id)));
        }

        let open_count = reservations
            .values()
            .filter(|r| r.reader_id == guard.reader_id && r.is_open())
            .count();
        if open_count != guard.reader_open_count {
            return Err(AppError::Conflict(format!(
                "Reader {} open reservations changed ({} != {})",
                guard.reader_id, open_count, guard.reader_open_count
            )));
        }
        if reservations.contains_key(&reservation.id) {
            return Err(AppError::Conflict(format!(
                "Reservation {} already exists",
                reservation.id
            )));
        }

        book.copies_available -= 1;
        book.version += 1;
        reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn commit_extend(&self, reservation: &Reservation) -> AppResult<()> {
        let mut reservations = self.tables.reservations.write();
        let stored = reservations.get_mut(&reservation.id).ok_or_else(|| {
            AppError::Conflict(format!("Reservation {} disappeared", reservation.id))
        })?;
        if !stored.is_open() || stored.extended {
            return Err(AppError::Conflict(format!(
                "Reservation {} changed since it was read",
                reservation.id
            )));
        }
        *stored = reservation.clone();
        Ok(())
    }

    async fn close(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Reservation> {
        let mut books = self.tables.books.write();
        let mut reservations = self.tables.reservations.write();

        let stored = reservations
            .get_mut(&id)
            .ok_or_else(|| AppError::Conflict(format!("Reservation {} disappeared", id)))?;
        if stored.is_closed() {
            return Err(AppError::Conflict(format!("Reservation {} already closed", id)));
        }

        *stored = stored.closed(now);
        // The book may have been withdrawn from the catalog meanwhile
        if let Some(book) = books.get_mut(&stored.book_id) {
            book.copies_available = (book.copies_available + 1).min(book.copies_total);
            book.version += 1;
        }
        Ok(stored.clone())
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn get_for_pair(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<Option<Rating>> {
        Ok(self.tables.ratings.read().get(&(reader_id, book_id)).cloned())
    }

    async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Rating>> {
        let mut ratings: Vec<Rating> = self
            .tables
            .ratings
            .read()
            .values()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        ratings.sort_by_key(|r| r.created_at);
        Ok(ratings)
    }

    async fn insert(&self, rating: &Rating) -> AppResult<()> {
        let mut ratings = self.tables.ratings.write();
        let key = (rating.reader_id, rating.book_id);
        if ratings.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "Reader {} already rated book {}",
                rating.reader_id, rating.book_id
            )));
        }
        ratings.insert(key, rating.clone());
        Ok(())
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn insert(&self, favorite: &FavoriteBook) -> AppResult<()> {
        let mut favorites = self.tables.favorites.write();
        let key = (favorite.reader_id, favorite.book_id);
        if favorites.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "Book {} already a favorite of reader {}",
                favorite.book_id, favorite.reader_id
            )));
        }
        favorites.insert(key, favorite.clone());
        Ok(())
    }

    async fn contains(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<bool> {
        Ok(self.tables.favorites.read().contains_key(&(reader_id, book_id)))
    }

    async fn list_by_reader(&self, reader_id: Uuid) -> AppResult<Vec<FavoriteBook>> {
        let mut favorites: Vec<FavoriteBook> = self
            .tables
            .favorites
            .read()
            .values()
            .filter(|f| f.reader_id == reader_id)
            .cloned()
            .collect();
        favorites.sort_by_key(|f| f.added_at);
        Ok(favorites)
    }
}
