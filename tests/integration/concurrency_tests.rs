//! Concurrent access tests. Run on the multi-threaded runtime so the engine
//! really races against itself.

use std::sync::Arc;

use booksmart_lending::{models::Rarity, AppError, Denial};

use crate::common::Library;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_copies_never_oversold() {
    let library = Arc::new(Library::new());
    let book = library.book("Popular", Rarity::Common, 3, 0).await;

    let mut readers = Vec::new();
    for i in 0..10 {
        readers.push(library.reader(&format!("+7100000000{}", i), 25).await);
    }

    let mut handles = Vec::new();
    for reader in readers {
        let library = library.clone();
        let book_id = book.id;
        handles.push(tokio::spawn(async move {
            library
                .services
                .reservations
                .create_reservation(reader.id, book_id)
                .await
        }));
    }

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(AppError::Denied(Denial::NoCopiesAvailable)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(granted, 3);
    assert_eq!(library.copies_available(&book).await, 0);
    let open = library
        .services
        .reservations
        .reservations_for_book(book.id)
        .await
        .unwrap();
    assert_eq!(open.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unique_book_single_holder() {
    let library = Arc::new(Library::new());
    let unique = library.book("Codex", Rarity::Unique, 1, 0).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let reader = library.reader(&format!("+7200000000{}", i), 25).await;
        let library = library.clone();
        let book_id = unique.id;
        handles.push(tokio::spawn(async move {
            library
                .services
                .reservations
                .create_reservation(reader.id, book_id)
                .await
        }));
    }

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(AppError::Denied(Denial::UniqueBookUnavailable)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(granted, 1);
    assert_eq!(library.copies_available(&unique).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reader_limit_holds_under_concurrency() {
    let library = Arc::new(Library::new());
    let reader_id = library.reader("+73000000000", 25).await.id;

    let mut handles = Vec::new();
    for i in 0..9 {
        let book = library.book(&format!("Volume {}", i), Rarity::Common, 1, 0).await;
        let library = library.clone();
        handles.push(tokio::spawn(async move {
            library
                .services
                .reservations
                .create_reservation(reader_id, book.id)
                .await
        }));
    }

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(AppError::Denied(Denial::ReservationLimitExceeded { limit })) => assert_eq!(limit, 5),
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(granted, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_returns_restore_every_copy() {
    let library = Arc::new(Library::new());
    let book = library.book("Shared", Rarity::Common, 4, 0).await;

    let mut reservations = Vec::new();
    for i in 0..4 {
        let reader = library.reader(&format!("+7400000000{}", i), 25).await;
        reservations.push(
            library
                .services
                .reservations
                .create_reservation(reader.id, book.id)
                .await
                .unwrap(),
        );
    }
    assert_eq!(library.copies_available(&book).await, 0);

    let mut handles = Vec::new();
    for reservation in reservations {
        // Each reservation is closed twice at once; only one close may win
        for _ in 0..2 {
            let library = library.clone();
            let id = reservation.id;
            handles.push(tokio::spawn(async move {
                library.services.reservations.close_reservation(id).await
            }));
        }
    }

    let mut closed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => closed += 1,
            Err(AppError::Denied(Denial::ReservationClosed)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(closed, 4);
    assert_eq!(library.copies_available(&book).await, 4);
}
