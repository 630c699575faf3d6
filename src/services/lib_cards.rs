//! Library card registry service

use std::sync::Arc;

use uuid::Uuid;

use super::locks::EntityLocks;
use crate::{
    clock::Clock,
    config::LendingConfig,
    error::{AppError, AppResult, Denial},
    models::LibCard,
    repository::Repository,
};

/// Card changes take the reader's lock: they feed the reader's eligibility
#[derive(Clone)]
pub struct LibCardsService {
    repository: Repository,
    config: Arc<LendingConfig>,
    clock: Arc<dyn Clock>,
    locks: EntityLocks,
}

impl LibCardsService {
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

    fn validity_days(&self) -> AppResult<i32> {
        i32::try_from(self.config.card_validity_days)
            .ok()
            .filter(|days| *days > 0)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Card validity of {} days is out of range",
                    self.config.card_validity_days
                ))
            })
    }

    /// Issue the reader's one and only card
    pub async fn create_card(&self, reader_id: Uuid) -> AppResult<LibCard> {
        let _guard = self.locks.lock(&[reader_id]).await;

        self.repository
            .readers
            .get(reader_id)
            .await?
            .ok_or(Denial::ReaderNotFound)?;
        if self.repository.lib_cards.get_by_reader(reader_id).await?.is_some() {
            return Err(Denial::LibCardAlreadyExists.into());
        }

        let card = LibCard::issue(reader_id, self.validity_days()?, self.clock.now());
        match self.repository.lib_cards.insert(&card).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => return Err(Denial::LibCardAlreadyExists.into()),
            Err(e) => return Err(e),
        }

        tracing::info!(
            "Library card {} issued to reader {}, valid for {} days",
            card.number,
            reader_id,
            card.validity_days
        );
        Ok(card)
    }

    pub async fn get_card(&self, reader_id: Uuid) -> AppResult<LibCard> {
        let card = self
            .repository
            .lib_cards
            .get_by_reader(reader_id)
            .await?
            .ok_or(Denial::LibCardMissing)?;
        Ok(card)
    }

    /// Restart the validity window of an expired or deactivated card
    pub async fn renew_card(&self, reader_id: Uuid) -> AppResult<LibCard> {
        let _guard = self.locks.lock(&[reader_id]).await;

        let card = self.get_card(reader_id).await?;
        let now = self.clock.now();
        if !card.can_renew(now) {
            return Err(Denial::LibCardStillValid.into());
        }

        let renewed = card.renewed(self.validity_days()?, now);
        self.repository.lib_cards.update(&renewed).await?;
        tracing::info!(
            "Library card {} renewed for {} days",
            renewed.number,
            renewed.validity_days
        );
        Ok(renewed)
    }

    /// Administrative switch-off; the card stays on record
    pub async fn deactivate_card(&self, reader_id: Uuid) -> AppResult<LibCard> {
        let _guard = self.locks.lock(&[reader_id]).await;

        let card = self.get_card(reader_id).await?;
        if !card.active {
            return Ok(card);
        }

        let card = LibCard {
            active: false,
            ..card
        };
        self.repository.lib_cards.update(&card).await?;
        tracing::info!("Library card {} deactivated", card.number);
        Ok(card)
    }
}
