//! Business logic services

pub mod catalog;
pub mod eligibility;
pub mod lib_cards;
pub mod locks;
pub mod ratings;
pub mod readers;
pub mod reservations;

use std::sync::Arc;

use crate::{clock::Clock, config::LendingConfig, repository::Repository};

pub use locks::EntityLocks;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub readers: readers::ReadersService,
    pub lib_cards: lib_cards::LibCardsService,
    pub reservations: reservations::ReservationsService,
    pub ratings: ratings::RatingsService,
}

impl Services {
    /// Create all services over one repository. They share one set of
    /// entity locks, so catalog and card changes serialize with the engine.
    pub fn new(repository: Repository, config: LendingConfig, clock: Arc<dyn Clock>) -> Self {
        let config = Arc::new(config);
        let locks = EntityLocks::new();

        Self {
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone(), locks.clone()),
            readers: readers::ReadersService::new(repository.clone(), clock.clone()),
            lib_cards: lib_cards::LibCardsService::new(
                repository.clone(),
                config.clone(),
                clock.clone(),
                locks.clone(),
            ),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                config,
                clock.clone(),
                locks,
            ),
            ratings: ratings::RatingsService::new(repository, clock),
        }
    }
}
