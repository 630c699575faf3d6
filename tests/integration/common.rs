//! Shared fixtures

use std::sync::Arc;

use booksmart_lending::{
    config::LendingConfig,
    models::{Book, NewBook, NewReader, Rarity, Reader},
    repository::Repository,
    services::Services,
    ManualClock,
};

pub struct Library {
    pub clock: ManualClock,
    pub services: Services,
}

impl Library {
    pub fn new() -> Self {
        Self::with_config(LendingConfig::default())
    }

    pub fn with_config(config: LendingConfig) -> Self {
        let clock = ManualClock::default();
        let services = Services::new(Repository::in_memory(), config, Arc::new(clock.clone()));
        Self { clock, services }
    }

    /// Registered reader holding a fresh card
    pub async fn reader(&self, phone: &str, age: i32) -> Reader {
        let reader = self.reader_without_card(phone, age).await;
        self.services.lib_cards.create_card(reader.id).await.unwrap();
        reader
    }

    pub async fn reader_without_card(&self, phone: &str, age: i32) -> Reader {
        self.services
            .readers
            .register_reader(NewReader {
                fio: format!("Reader {}", phone),
                phone_number: phone.to_string(),
                age,
            })
            .await
            .unwrap()
    }

    pub async fn book(&self, title: &str, rarity: Rarity, copies_total: i32, age_limit: i32) -> Book {
        self.services
            .catalog
            .add_book(NewBook {
                title: title.to_string(),
                author: "Various".to_string(),
                publisher: None,
                genre: None,
                publishing_year: None,
                language: None,
                rarity,
                age_limit,
                copies_total,
            })
            .await
            .unwrap()
    }

    pub async fn copies_available(&self, book: &Book) -> i32 {
        self.services
            .catalog
            .get_book(book.id)
            .await
            .unwrap()
            .copies_available
    }
}
