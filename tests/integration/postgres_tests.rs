//! Guarded writes against a real PostgreSQL database

use booksmart_lending::{
    bootstrap,
    config::{AppConfig, DatabaseConfig, StorageBackend, StorageConfig},
    models::{Book, NewBook, NewReader, Rarity, Reader, Reservation},
    repository::{BookStore, CreateGuard, ReaderStore, Repository, ReservationStore},
    AppError,
};
use chrono::Utc;
use uuid::Uuid;

async fn database() -> Option<Repository> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = AppConfig {
        storage: StorageConfig {
            backend: StorageBackend::Postgres,
        },
        database: DatabaseConfig {
            url,
            ..DatabaseConfig::default()
        },
        ..AppConfig::default()
    };
    Some(bootstrap::build_repository(&config).await.unwrap())
}

async fn reader(repository: &Repository) -> Reader {
    let reader = NewReader {
        fio: "Pg Reader".to_string(),
        phone_number: format!("+7{}", &Uuid::new_v4().simple().to_string()[..12]),
        age: 30,
    }
    .into_reader(Utc::now());
    repository.readers.insert(&reader).await.unwrap();
    reader
}

async fn book(repository: &Repository, copies_total: i32) -> Book {
    let book = NewBook {
        title: "Pg Book".to_string(),
        author: "Various".to_string(),
        publisher: None,
        genre: None,
        publishing_year: None,
        language: None,
        rarity: Rarity::Common,
        age_limit: 0,
        copies_total,
    }
    .into_book(Utc::now());
    repository.books.insert(&book).await.unwrap();
    book
}

fn guard_for(reader: &Reader, book: &Book, reader_open_count: usize) -> CreateGuard {
    CreateGuard {
        reader_id: reader.id,
        book_id: book.id,
        book_version: book.version,
        reader_open_count,
    }
}

#[tokio::test]
#[ignore] // Run with: DATABASE_URL=... cargo test -- --ignored
async fn test_pg_commit_create_rechecks_version_and_count() {
    let Some(repository) = database().await else { return };
    let reader = reader(&repository).await;
    let book = book(&repository, 2).await;

    let reservation = Reservation::issue(reader.id, book.id, 14, Utc::now()).unwrap();
    let stale_version = CreateGuard {
        book_version: book.version + 1,
        ..guard_for(&reader, &book, 0)
    };
    let err = repository
        .reservations
        .commit_create(&stale_version, &reservation)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(repository.reservations.get(reservation.id).await.unwrap().is_none());

    let stale_count = guard_for(&reader, &book, 1);
    let err = repository
        .reservations
        .commit_create(&stale_count, &reservation)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = repository.books.get(book.id).await.unwrap().unwrap();
    assert_eq!(stored.copies_available, 2);
    assert_eq!(stored.version, book.version);

    repository
        .reservations
        .commit_create(&guard_for(&reader, &book, 0), &reservation)
        .await
        .unwrap();
    let stored = repository.books.get(book.id).await.unwrap().unwrap();
    assert_eq!(stored.copies_available, 1);
    assert_eq!(stored.version, book.version + 1);
    assert!(repository.reservations.get(reservation.id).await.unwrap().is_some());
}

#[tokio::test]
#[ignore]
async fn test_pg_commit_extend_applies_once() {
    let Some(repository) = database().await else { return };
    let reader = reader(&repository).await;
    let book = book(&repository, 1).await;

    let reservation = Reservation::issue(reader.id, book.id, 14, Utc::now()).unwrap();
    repository
        .reservations
        .commit_create(&guard_for(&reader, &book, 0), &reservation)
        .await
        .unwrap();

    let extended = reservation.extended_by(7).unwrap();
    repository.reservations.commit_extend(&extended).await.unwrap();
    let err = repository
        .reservations
        .commit_extend(&extended.extended_by(7).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = repository.reservations.get(reservation.id).await.unwrap().unwrap();
    assert_eq!(stored.return_date, extended.return_date);
    assert!(stored.extended);
}

#[tokio::test]
#[ignore]
async fn test_pg_close_never_exceeds_copies_total() {
    let Some(repository) = database().await else { return };
    let reader = reader(&repository).await;
    let book = book(&repository, 1).await;

    // Plain insert leaves the counter at copies_total
    let reservation = Reservation::issue(reader.id, book.id, 14, Utc::now()).unwrap();
    repository.reservations.insert(&reservation).await.unwrap();

    let closed = repository
        .reservations
        .close(reservation.id, Utc::now())
        .await
        .unwrap();
    assert!(closed.is_closed());

    let stored = repository.books.get(book.id).await.unwrap().unwrap();
    assert_eq!(stored.copies_available, 1);
    assert_eq!(stored.version, book.version + 1);

    let err = repository
        .reservations
        .close(reservation.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let stored = repository.books.get(book.id).await.unwrap().unwrap();
    assert_eq!(stored.version, book.version + 1);
}
