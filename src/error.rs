//! Error types for the lending core

use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes handed to transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    DbFailure = 2,
    NotFound = 3,
    BadValue = 4,
    Unavailable = 5,
    Timeout = 6,
    ReaderNotFound = 10,
    ReaderAlreadyExists = 11,
    ReaderHasOverdueBook = 12,
    ReservationLimitExceeded = 13,
    LibCardMissing = 20,
    LibCardInvalid = 21,
    LibCardAlreadyExists = 22,
    LibCardStillValid = 23,
    BookNotFound = 30,
    NoCopiesAvailable = 31,
    UniqueBookUnavailable = 32,
    AgeRestricted = 33,
    BookHasOpenReservations = 34,
    BookAlreadyFavorite = 35,
    DuplicateReservation = 40,
    ReservationNotFound = 41,
    ReservationClosed = 42,
    ReservationExpired = 43,
    AlreadyExtended = 44,
    RareBookNotExtendable = 45,
    InvalidScore = 50,
    NeverBorrowed = 51,
    DuplicateRating = 52,
    NoRatings = 53,
}

/// Coarse classification used by transports and by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, never retried
    Validation,
    /// Named business-rule failure, no mutation performed
    Denial,
    /// Concurrent modification or exhausted retries
    Conflict,
    /// Collaborator failure (storage, clock)
    Internal,
}

/// Business-rule denials reported verbatim to the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    #[error("reader not found")]
    ReaderNotFound,

    #[error("a reader with this phone number already exists")]
    ReaderAlreadyExists,

    #[error("reader has an overdue book")]
    ReaderHasOverdueBook,

    #[error("reservation limit exceeded ({limit} open reservations allowed)")]
    ReservationLimitExceeded { limit: u32 },

    #[error("reader has no library card")]
    LibCardMissing,

    #[error("library card is inactive or expired")]
    LibCardInvalid,

    #[error("reader already has a library card")]
    LibCardAlreadyExists,

    #[error("library card is still valid")]
    LibCardStillValid,

    #[error("book not found")]
    BookNotFound,

    #[error("no copies of the book are available")]
    NoCopiesAvailable,

    #[error("the unique copy of this book is already reserved")]
    UniqueBookUnavailable,

    #[error("reader is {age}, book requires {required}+")]
    AgeRestricted { required: i32, age: i32 },

    #[error("book has open reservations")]
    BookHasOpenReservations,

    #[error("book is already among the reader's favorites")]
    BookAlreadyFavorite,

    #[error("reader already has an open reservation for this book")]
    DuplicateReservation,

    #[error("reservation not found")]
    ReservationNotFound,

    #[error("reservation is closed")]
    ReservationClosed,

    #[error("reservation is expired, the book must be returned")]
    ReservationExpired,

    #[error("reservation has already been extended")]
    AlreadyExtended,

    #[error("rare and unique books cannot be extended")]
    RareBookNotExtendable,

    #[error("reader never borrowed this book")]
    NeverBorrowed,

    #[error("reader already rated this book")]
    DuplicateRating,

    #[error("book has no ratings")]
    NoRatings,
}

impl Denial {
    pub fn code(&self) -> ErrorCode {
        match self {
            Denial::ReaderNotFound => ErrorCode::ReaderNotFound,
            Denial::ReaderAlreadyExists => ErrorCode::ReaderAlreadyExists,
            Denial::ReaderHasOverdueBook => ErrorCode::ReaderHasOverdueBook,
            Denial::ReservationLimitExceeded { .. } => ErrorCode::ReservationLimitExceeded,
            Denial::LibCardMissing => ErrorCode::LibCardMissing,
            Denial::LibCardInvalid => ErrorCode::LibCardInvalid,
            Denial::LibCardAlreadyExists => ErrorCode::LibCardAlreadyExists,
            Denial::LibCardStillValid => ErrorCode::LibCardStillValid,
            Denial::BookNotFound => ErrorCode::BookNotFound,
            Denial::NoCopiesAvailable => ErrorCode::NoCopiesAvailable,
            Denial::UniqueBookUnavailable => ErrorCode::UniqueBookUnavailable,
            Denial::AgeRestricted { .. } => ErrorCode::AgeRestricted,
            Denial::BookHasOpenReservations => ErrorCode::BookHasOpenReservations,
            Denial::BookAlreadyFavorite => ErrorCode::BookAlreadyFavorite,
            Denial::DuplicateReservation => ErrorCode::DuplicateReservation,
            Denial::ReservationNotFound => ErrorCode::ReservationNotFound,
            Denial::ReservationClosed => ErrorCode::ReservationClosed,
            Denial::ReservationExpired => ErrorCode::ReservationExpired,
            Denial::AlreadyExtended => ErrorCode::AlreadyExtended,
            Denial::RareBookNotExtendable => ErrorCode::RareBookNotExtendable,
            Denial::NeverBorrowed => ErrorCode::NeverBorrowed,
            Denial::DuplicateRating => ErrorCode::DuplicateRating,
            Denial::NoRatings => ErrorCode::NoRatings,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid score {0}: expected a value between 0 and 5")]
    InvalidScore(i32),

    #[error("Denied: {0}")]
    Denied(#[from] Denial),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Deadline of {0} ms exceeded")]
    Timeout(u64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::InvalidScore(_) => ErrorKind::Validation,
            AppError::Denied(_) | AppError::NotFound(_) => ErrorKind::Denial,
            AppError::Conflict(_) | AppError::Unavailable(_) | AppError::Timeout(_) => {
                ErrorKind::Conflict
            }
            AppError::Database(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::InvalidScore(_) => ErrorCode::InvalidScore,
            AppError::Denied(denial) => denial.code(),
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) | AppError::Unavailable(_) => ErrorCode::Unavailable,
            AppError::Timeout(_) => ErrorCode::Timeout,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    /// The denial carried by this error, if it is one
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            AppError::Denied(denial) => Some(denial),
            _ => None,
        }
    }

    /// Build the body a transport sends back, logging internal failures
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let code = self.code();
        ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            kind: self.kind(),
            message,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error body for transports fronting the core
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
