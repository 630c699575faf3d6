//! Rating ledger service

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    clock::Clock,
    error::{AppError, AppResult, Denial},
    models::{rating::average_score, NewRating, Rating},
    repository::Repository,
};

#[derive(Clone)]
pub struct RatingsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl RatingsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Rate a book the reader has borrowed at least once
    pub async fn add_rating(&self, rating: NewRating) -> AppResult<Rating> {
        if !rating.score_in_range() {
            return Err(AppError::InvalidScore(rating.score));
        }
        rating.validate()?;

        let (reader_id, book_id) = (rating.reader_id, rating.book_id);
        if !self
            .repository
            .reservations
            .has_borrowed(reader_id, book_id)
            .await?
        {
            return Err(Denial::NeverBorrowed.into());
        }
        if self
            .repository
            .ratings
            .get_for_pair(reader_id, book_id)
            .await?
            .is_some()
        {
            return Err(Denial::DuplicateRating.into());
        }

        let rating = rating.into_rating(self.clock.now());
        match self.repository.ratings.insert(&rating).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => return Err(Denial::DuplicateRating.into()),
            Err(e) => return Err(e),
        }

        tracing::info!(
            "Reader {} rated book {} with {}",
            reader_id,
            book_id,
            rating.score
        );
        Ok(rating)
    }

    /// Mean score of a book
    pub async fn average_score(&self, book_id: Uuid) -> AppResult<f64> {
        let ratings = self.repository.ratings.list_by_book(book_id).await?;
        let average = average_score(&ratings).ok_or(Denial::NoRatings)?;
        Ok(average)
    }

    pub async fn ratings_for_book(&self, book_id: Uuid) -> AppResult<Vec<Rating>> {
        self.repository.ratings.list_by_book(book_id).await
    }
}
