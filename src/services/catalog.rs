//! Catalog service for book management

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use super::locks::EntityLocks;
use crate::{
    clock::Clock,
    error::{AppResult, Denial},
    models::{Book, BookQuery, NewBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    locks: EntityLocks,
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, locks: EntityLocks) -> Self {
        Self {
            repository,
            clock,
            locks,
        }
    }

    /// Add a book with all its copies available
    pub async fn add_book(&self, book: NewBook) -> AppResult<Book> {
        book.validate()?;

        let book = book.into_book(self.clock.now());
        self.repository.books.insert(&book).await?;
        tracing::info!(
            "Book {} added: \"{}\" ({}, {} copies)",
            book.id,
            book.title,
            book.rarity,
            book.copies_total
        );
        Ok(book)
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        let book = self
            .repository
            .books
            .get(id)
            .await?
            .ok_or(Denial::BookNotFound)?;
        Ok(book)
    }

    /// Books matching the filter, ordered by title
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list(query).await
    }

    /// Withdraw a book. Refused while a reader still holds a copy.
    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        let _guard = self.locks.lock(&[id]).await;

        self.get_book(id).await?;
        if !self.repository.reservations.list_open_by_book(id).await?.is_empty() {
            return Err(Denial::BookHasOpenReservations.into());
        }

        if !self.repository.books.delete(id).await? {
            return Err(Denial::BookNotFound.into());
        }
        tracing::info!("Book {} deleted", id);
        Ok(())
    }
}
