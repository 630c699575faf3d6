//! Reader directory service

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    clock::Clock,
    error::{AppError, AppResult, Denial},
    models::{Book, FavoriteBook, NewReader, Reader},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReadersService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl ReadersService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Register a reader. Phone numbers identify readers and must be unique.
    pub async fn register_reader(&self, reader: NewReader) -> AppResult<Reader> {
        reader.validate()?;

        if self
            .repository
            .readers
            .find_by_phone(&reader.phone_number)
            .await?
            .is_some()
        {
            return Err(Denial::ReaderAlreadyExists.into());
        }

        let reader = reader.into_reader(self.clock.now());
        match self.repository.readers.insert(&reader).await {
            Ok(()) => {}
            // Lost a race against another registration with the same number
            Err(AppError::Conflict(_)) => return Err(Denial::ReaderAlreadyExists.into()),
            Err(e) => return Err(e),
        }

        tracing::info!("Reader {} registered", reader.id);
        Ok(reader)
    }

    pub async fn get_reader(&self, id: Uuid) -> AppResult<Reader> {
        let reader = self
            .repository
            .readers
            .get(id)
            .await?
            .ok_or(Denial::ReaderNotFound)?;
        Ok(reader)
    }

    pub async fn find_reader_by_phone(&self, phone_number: &str) -> AppResult<Reader> {
        let reader = self
            .repository
            .readers
            .find_by_phone(phone_number)
            .await?
            .ok_or(Denial::ReaderNotFound)?;
        Ok(reader)
    }

    /// Mark a catalog book as one of the reader's favorites
    pub async fn add_to_favorites(&self, reader_id: Uuid, book_id: Uuid) -> AppResult<FavoriteBook> {
        self.get_reader(reader_id).await?;
        self.repository
            .books
            .get(book_id)
            .await?
            .ok_or(Denial::BookNotFound)?;

        if self.repository.favorites.contains(reader_id, book_id).await? {
            return Err(Denial::BookAlreadyFavorite.into());
        }

        let favorite = FavoriteBook {
            reader_id,
            book_id,
            added_at: self.clock.now(),
        };
        match self.repository.favorites.insert(&favorite).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => return Err(Denial::BookAlreadyFavorite.into()),
            Err(e) => return Err(e),
        }

        tracing::info!("Book {} added to favorites of reader {}", book_id, reader_id);
        Ok(favorite)
    }

    /// Favorite books of a reader in the order they were added. Titles
    /// withdrawn from the catalog are left out.
    pub async fn favorite_books(&self, reader_id: Uuid) -> AppResult<Vec<Book>> {
        self.get_reader(reader_id).await?;

        let favorites = self.repository.favorites.list_by_reader(reader_id).await?;
        let mut books = Vec::with_capacity(favorites.len());
        for favorite in favorites {
            if let Some(book) = self.repository.books.get(favorite.book_id).await? {
                books.push(book);
            }
        }
        Ok(books)
    }
}
