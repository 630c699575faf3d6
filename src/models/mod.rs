//! Data models for the lending core

pub mod book;
pub mod favorite;
pub mod lib_card;
pub mod rating;
pub mod reader;
pub mod reservation;

// Re-export commonly used types
pub use book::{Book, BookQuery, NewBook, Rarity};
pub use favorite::FavoriteBook;
pub use lib_card::LibCard;
pub use rating::{NewRating, Rating};
pub use reader::{NewReader, Reader};
pub use reservation::{Reservation, ReservationState};
