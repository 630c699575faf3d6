//! BookSmart lending core
//!
//! Reservation and eligibility engine of the BookSmart library: book catalog,
//! reader directory, library cards, reservations and ratings. Transports link
//! this crate and call into [`services::Services`].

pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod telemetry;

pub use bootstrap::AppState;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{AppError, AppResult, Denial, ErrorCode, ErrorKind};
