//! Reservation lifecycle tests

use booksmart_lending::{
    config::LendingConfig,
    models::{Rarity, ReservationState},
    AppError, Clock, Denial,
};

use crate::common::Library;

fn denial(result: Result<impl std::fmt::Debug, AppError>) -> Denial {
    match result {
        Err(AppError::Denied(denial)) => denial,
        other => panic!("expected a denial, got {:?}", other),
    }
}

#[tokio::test]
async fn test_common_book_extend_once_and_age_limit() {
    let library = Library::new();
    let b1 = library.book("B1", Rarity::Common, 2, 12).await;
    let r1 = library.reader("+70000000001", 20).await;
    let r2 = library.reader("+70000000002", 10).await;

    let reservation = library
        .services
        .reservations
        .create_reservation(r1.id, b1.id)
        .await
        .unwrap();
    assert_eq!(reservation.state, ReservationState::Issued);
    assert_eq!(library.copies_available(&b1).await, 1);

    let extended = library
        .services
        .reservations
        .extend_reservation(reservation.id, 7)
        .await
        .unwrap();
    assert_eq!(extended.state, ReservationState::Extended);
    assert!(extended.extended);

    let second = library
        .services
        .reservations
        .extend_reservation(reservation.id, 7)
        .await;
    assert_eq!(denial(second), Denial::AlreadyExtended);

    let too_young = library.services.reservations.create_reservation(r2.id, b1.id).await;
    assert_eq!(
        denial(too_young),
        Denial::AgeRestricted { required: 12, age: 10 }
    );
    assert_eq!(library.copies_available(&b1).await, 1);
}

#[tokio::test]
async fn test_unique_book_is_released_on_close() {
    let library = Library::new();
    let u1 = library.book("U1", Rarity::Unique, 1, 0).await;
    let r1 = library.reader("+70000000001", 20).await;
    let r2 = library.reader("+70000000002", 30).await;

    let held = library
        .services
        .reservations
        .create_reservation(r1.id, u1.id)
        .await
        .unwrap();

    let blocked = library.services.reservations.create_reservation(r2.id, u1.id).await;
    assert_eq!(denial(blocked), Denial::UniqueBookUnavailable);

    let closed = library
        .services
        .reservations
        .close_reservation(held.id)
        .await
        .unwrap();
    assert_eq!(closed.state, ReservationState::Closed);
    assert_eq!(closed.closed_at, Some(library.clock.now()));
    assert_eq!(library.copies_available(&u1).await, 1);

    library
        .services
        .reservations
        .create_reservation(r2.id, u1.id)
        .await
        .unwrap();
    assert_eq!(library.copies_available(&u1).await, 0);
}

#[tokio::test]
async fn test_overdue_reader_is_blocked_until_return() {
    let library = Library::new();
    let b1 = library.book("B1", Rarity::Common, 2, 0).await;
    let b2 = library.book("B2", Rarity::Common, 2, 0).await;
    let r1 = library.reader("+70000000001", 20).await;

    let overdue = library
        .services
        .reservations
        .create_reservation(r1.id, b1.id)
        .await
        .unwrap();
    library.clock.advance_days(15);

    let observed = library
        .services
        .reservations
        .get_reservation(overdue.id)
        .await
        .unwrap();
    assert_eq!(observed.state, ReservationState::Expired);

    let create = library.services.reservations.create_reservation(r1.id, b2.id).await;
    assert_eq!(denial(create), Denial::ReaderHasOverdueBook);

    let extend = library
        .services
        .reservations
        .extend_reservation(overdue.id, 7)
        .await;
    assert_eq!(denial(extend), Denial::ReservationExpired);

    // Returning the overdue book lifts the block
    library
        .services
        .reservations
        .close_reservation(overdue.id)
        .await
        .unwrap();
    library
        .services
        .reservations
        .create_reservation(r1.id, b2.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_overdue_reservation_blocks_extending_another() {
    let library = Library::new();
    let b1 = library.book("B1", Rarity::Common, 1, 0).await;
    let b2 = library.book("B2", Rarity::Common, 1, 0).await;
    let r1 = library.reader("+70000000001", 20).await;

    library
        .services
        .reservations
        .create_reservation(r1.id, b1.id)
        .await
        .unwrap();
    library.clock.advance_days(10);
    let fresh = library
        .services
        .reservations
        .create_reservation(r1.id, b2.id)
        .await
        .unwrap();
    library.clock.advance_days(5);

    let extend = library.services.reservations.extend_reservation(fresh.id, 3).await;
    assert_eq!(denial(extend), Denial::ReaderHasOverdueBook);
}

#[tokio::test]
async fn test_reservation_limit() {
    let library = Library::with_config(LendingConfig {
        max_open_reservations: 2,
        ..LendingConfig::default()
    });
    let reader = library.reader("+70000000001", 20).await;

    for title in ["A", "B"] {
        let book = library.book(title, Rarity::Common, 1, 0).await;
        library
            .services
            .reservations
            .create_reservation(reader.id, book.id)
            .await
            .unwrap();
    }

    let third = library.book("C", Rarity::Common, 1, 0).await;
    let result = library
        .services
        .reservations
        .create_reservation(reader.id, third.id)
        .await;
    assert_eq!(denial(result), Denial::ReservationLimitExceeded { limit: 2 });
    assert_eq!(library.copies_available(&third).await, 1);
}

#[tokio::test]
async fn test_card_missing_then_invalid() {
    let library = Library::new();
    let book = library.book("B1", Rarity::Common, 1, 0).await;
    let reader = library.reader_without_card("+70000000001", 20).await;

    let result = library
        .services
        .reservations
        .create_reservation(reader.id, book.id)
        .await;
    assert_eq!(denial(result), Denial::LibCardMissing);

    library.services.lib_cards.create_card(reader.id).await.unwrap();
    library.services.lib_cards.deactivate_card(reader.id).await.unwrap();
    let result = library
        .services
        .reservations
        .create_reservation(reader.id, book.id)
        .await;
    assert_eq!(denial(result), Denial::LibCardInvalid);

    library.services.lib_cards.renew_card(reader.id).await.unwrap();
    library
        .services
        .reservations
        .create_reservation(reader.id, book.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_card_blocks_extension() {
    let library = Library::with_config(LendingConfig {
        card_validity_days: 10,
        loan_period_days: 14,
        ..LendingConfig::default()
    });
    let book = library.book("B1", Rarity::Common, 1, 0).await;
    let reader = library.reader("+70000000001", 20).await;

    let reservation = library
        .services
        .reservations
        .create_reservation(reader.id, book.id)
        .await
        .unwrap();
    library.clock.advance_days(11);

    let result = library
        .services
        .reservations
        .extend_reservation(reservation.id, 5)
        .await;
    assert_eq!(denial(result), Denial::LibCardInvalid);
}

#[tokio::test]
async fn test_rare_books_are_not_extendable() {
    let library = Library::new();
    let rare = library.book("Incunabulum", Rarity::Rare, 3, 0).await;
    let reader = library.reader("+70000000001", 20).await;

    let reservation = library
        .services
        .reservations
        .create_reservation(reader.id, rare.id)
        .await
        .unwrap();
    let result = library
        .services
        .reservations
        .extend_reservation(reservation.id, 5)
        .await;
    assert_eq!(denial(result), Denial::RareBookNotExtendable);
}

#[tokio::test]
async fn test_duplicate_and_closed_reservations() {
    let library = Library::new();
    let book = library.book("B1", Rarity::Common, 3, 0).await;
    let reader = library.reader("+70000000001", 20).await;

    let reservation = library
        .services
        .reservations
        .create_reservation(reader.id, book.id)
        .await
        .unwrap();
    let again = library
        .services
        .reservations
        .create_reservation(reader.id, book.id)
        .await;
    assert_eq!(denial(again), Denial::DuplicateReservation);

    library
        .services
        .reservations
        .close_reservation(reservation.id)
        .await
        .unwrap();
    let close_again = library
        .services
        .reservations
        .close_reservation(reservation.id)
        .await;
    assert_eq!(denial(close_again), Denial::ReservationClosed);
    let extend_closed = library
        .services
        .reservations
        .extend_reservation(reservation.id, 3)
        .await;
    assert_eq!(denial(extend_closed), Denial::ReservationClosed);
    assert_eq!(library.copies_available(&book).await, 3);

    let history = library
        .services
        .reservations
        .reservations_for_reader(reader.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state, ReservationState::Closed);
}

#[tokio::test]
async fn test_unknown_entities() {
    let library = Library::new();
    let book = library.book("B1", Rarity::Common, 1, 0).await;
    let reader = library.reader("+70000000001", 20).await;
    let ghost = uuid::Uuid::new_v4();

    let result = library.services.reservations.create_reservation(ghost, book.id).await;
    assert_eq!(denial(result), Denial::ReaderNotFound);

    let result = library.services.reservations.create_reservation(reader.id, ghost).await;
    assert_eq!(denial(result), Denial::BookNotFound);

    let result = library.services.reservations.close_reservation(ghost).await;
    assert_eq!(denial(result), Denial::ReservationNotFound);
}

#[tokio::test]
async fn test_extension_beyond_the_calendar_leaves_reservation_untouched() {
    let library = Library::with_config(LendingConfig {
        max_extension_days: u32::MAX,
        ..LendingConfig::default()
    });
    let book = library.book("B1", Rarity::Common, 1, 0).await;
    let reader = library.reader("+70000000001", 20).await;

    let reservation = library
        .services
        .reservations
        .create_reservation(reader.id, book.id)
        .await
        .unwrap();
    let result = library
        .services
        .reservations
        .extend_reservation(reservation.id, u32::MAX)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let stored = library
        .services
        .reservations
        .get_reservation(reservation.id)
        .await
        .unwrap();
    assert_eq!(stored.state, ReservationState::Issued);
    assert_eq!(stored.return_date, reservation.return_date);

    // The one allowed extension is still available
    library
        .services
        .reservations
        .extend_reservation(reservation.id, 7)
        .await
        .unwrap();
}
