//! Repository layer: storage traits and their backends
//!
//! Each store owns one entity's records and never evaluates lending rules.
//! The coordinated writes (`commit_create`, `commit_extend`, `close`) are
//! conditional: when the condition recorded at snapshot time no longer holds
//! they fail with [`AppError::Conflict`](crate::error::AppError::Conflict) and
//! leave storage untouched.

pub mod books;
pub mod favorites;
pub mod lib_cards;
pub mod memory;
pub mod ratings;
pub mod readers;
pub mod reservations;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Book, BookQuery, FavoriteBook, LibCard, Rating, Reader, Reservation},
};

pub use memory::MemoryStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<Book>>;

    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>>;

    /// Conflict when a book with the same id exists
    async fn insert(&self, book: &Book) -> AppResult<()>;

    /// Returns false when there was nothing to delete
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReaderStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<Reader>>;

    async fn find_by_phone(&self, phone_number: &str) -> AppResult<Option<Reader>>;

    /// Conflict when the phone number is already registered
    async fn insert(&self, reader: &Reader) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibCardStore: Send + Sync {
    async fn get_by_reader(&self, reader_id: Uuid) -> AppResult<Option<LibCard>>;

    /// Conflict when the reader already holds a card
    async fn insert(&self, card: &LibCard) -> AppResult<()>;

    /// Replaces the stored card with the same id
    async fn update(&self, card: &LibCard) -> AppResult<()>;
}

/// What `commit_create` re-checks inside its atomic unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGuard {
    pub reader_id: Uuid,
    pub book_id: Uuid,
    /// Book version observed in the snapshot
    pub book_version: i64,
    /// Open reservations of the reader observed in the snapshot
    pub reader_open_count: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<Reservation>>;

    async fn list_by_reader(&self, reader_id: Uuid) -> AppResult<Vec<Reservation>>;

    async fn list_open_by_reader(&self, reader_id: Uuid) -> AppResult<Vec<Reservation>>;

    async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>>;

    async fn list_open_by_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>>;

    /// Any reservation, in any state, for the pair
    async fn has_borrowed(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<bool>;

    /// Plain record insert, leaves copy counters alone
    async fn insert(&self, reservation: &Reservation) -> AppResult<()>;

    /// Decrement the book's available copies and insert the reservation as
    /// one unit, provided the guard still matches
    async fn commit_create(&self, guard: &CreateGuard, reservation: &Reservation) -> AppResult<()>;

    /// Store an extended reservation, provided the stored one is still open
    /// and unextended
    async fn commit_extend(&self, reservation: &Reservation) -> AppResult<()>;

    /// Close an open reservation and give its copy back to the catalog
    async fn close(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Reservation>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn get_for_pair(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<Option<Rating>>;

    async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Rating>>;

    /// Conflict when the reader already rated the book
    async fn insert(&self, rating: &Rating) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Conflict when the book is already a favorite of the reader
    async fn insert(&self, favorite: &FavoriteBook) -> AppResult<()>;

    async fn contains(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<bool>;

    /// Favorites of a reader, oldest first
    async fn list_by_reader(&self, reader_id: Uuid) -> AppResult<Vec<FavoriteBook>>;
}

/// Main repository struct holding one handle per store
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub readers: Arc<dyn ReaderStore>,
    pub lib_cards: Arc<dyn LibCardStore>,
    pub reservations: Arc<dyn ReservationStore>,
    pub ratings: Arc<dyn RatingStore>,
    pub favorites: Arc<dyn FavoriteStore>,
}

impl Repository {
    /// All stores backed by one shared in-memory store
    pub fn in_memory() -> Self {
        Self::from_memory(MemoryStore::new())
    }

    pub fn from_memory(store: MemoryStore) -> Self {
        Self {
            books: Arc::new(store.clone()),
            readers: Arc::new(store.clone()),
            lib_cards: Arc::new(store.clone()),
            reservations: Arc::new(store.clone()),
            ratings: Arc::new(store.clone()),
            favorites: Arc::new(store),
        }
    }

    /// All stores backed by the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            readers: Arc::new(readers::ReadersRepository::new(pool.clone())),
            lib_cards: Arc::new(lib_cards::LibCardsRepository::new(pool.clone())),
            reservations: Arc::new(reservations::ReservationsRepository::new(pool.clone())),
            ratings: Arc::new(ratings::RatingsRepository::new(pool.clone())),
            favorites: Arc::new(favorites::FavoritesRepository::new(pool)),
        }
    }
}

/// Postgres unique violation, surfaced as a write conflict
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
