//! Reader directory tests: phone lookup and favorites

use booksmart_lending::{models::Rarity, Denial, ErrorCode};

use crate::common::Library;

#[tokio::test]
async fn test_reader_is_found_by_phone_number() {
    let library = Library::new();
    let reader = library.reader("+76000000001", 41).await;

    let found = library
        .services
        .readers
        .find_reader_by_phone("+76000000001")
        .await
        .unwrap();
    assert_eq!(found.id, reader.id);
    assert_eq!(found.age, 41);

    let missing = library
        .services
        .readers
        .find_reader_by_phone("+76000000002")
        .await
        .unwrap_err();
    assert_eq!(missing.denial(), Some(&Denial::ReaderNotFound));
}

#[tokio::test]
async fn test_favorite_books_of_a_reader() {
    let library = Library::new();
    let reader = library.reader("+76000000001", 25).await;
    let other = library.reader("+76000000002", 25).await;
    let solaris = library.book("Solaris", Rarity::Common, 2, 0).await;
    let codex = library.book("Codex", Rarity::Unique, 1, 0).await;

    library
        .services
        .readers
        .add_to_favorites(reader.id, solaris.id)
        .await
        .unwrap();
    library.clock.advance_days(1);
    library
        .services
        .readers
        .add_to_favorites(reader.id, codex.id)
        .await
        .unwrap();

    let again = library
        .services
        .readers
        .add_to_favorites(reader.id, solaris.id)
        .await
        .unwrap_err();
    assert_eq!(again.denial(), Some(&Denial::BookAlreadyFavorite));
    assert_eq!(again.to_response().code, ErrorCode::BookAlreadyFavorite as u32);

    // Favorites belong to one reader
    library
        .services
        .readers
        .add_to_favorites(other.id, solaris.id)
        .await
        .unwrap();

    let favorites = library.services.readers.favorite_books(reader.id).await.unwrap();
    let ids: Vec<_> = favorites.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![solaris.id, codex.id]);
    assert_eq!(
        library.services.readers.favorite_books(other.id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_favorites_of_unknown_reader_or_book() {
    let library = Library::new();
    let reader = library.reader("+76000000001", 25).await;
    let book = library.book("Solaris", Rarity::Common, 1, 0).await;
    let ghost = uuid::Uuid::new_v4();

    let err = library
        .services
        .readers
        .add_to_favorites(ghost, book.id)
        .await
        .unwrap_err();
    assert_eq!(err.denial(), Some(&Denial::ReaderNotFound));

    let err = library
        .services
        .readers
        .add_to_favorites(reader.id, ghost)
        .await
        .unwrap_err();
    assert_eq!(err.denial(), Some(&Denial::BookNotFound));
}
