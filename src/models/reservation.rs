//! Reservation model and lifecycle

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Reservation lifecycle state.
///
/// `Expired` is never written by the engine: it is derived from
/// `return_date` every time a reservation is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationState {
    Issued,
    Extended,
    Closed,
    Expired,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationState::Issued => "issued",
            ReservationState::Extended => "extended",
            ReservationState::Closed => "closed",
            ReservationState::Expired => "expired",
        }
    }
}

impl std::fmt::Display for ReservationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "issued" => Ok(ReservationState::Issued),
            "extended" => Ok(ReservationState::Extended),
            "closed" => Ok(ReservationState::Closed),
            "expired" => Ok(ReservationState::Expired),
            _ => Err(format!("Invalid reservation state: {}", s)),
        }
    }
}

// SQLx conversion for ReservationState (stored as text)
impl sqlx::Type<Postgres> for ReservationState {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for ReservationState {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for ReservationState {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub reader_id: Uuid,
    pub book_id: Uuid,
    pub issue_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    /// Stored state; use [`Reservation::state_at`] for the effective one
    pub state: ReservationState,
    pub extended: bool,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn issue(
        reader_id: Uuid,
        book_id: Uuid,
        loan_period_days: u32,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            reader_id,
            book_id,
            issue_date: now,
            return_date: days_after(now, loan_period_days)?,
            state: ReservationState::Issued,
            extended: false,
            closed_at: None,
        })
    }

    /// Issued or Extended in storage. Overdue reservations stay open until
    /// the book comes back.
    pub fn is_open(&self) -> bool {
        matches!(
            self.state,
            ReservationState::Issued | ReservationState::Extended
        )
    }

    pub fn is_closed(&self) -> bool {
        self.state == ReservationState::Closed
    }

    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        now > self.return_date
    }

    /// Open and past its return date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.is_past_due(now)
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> ReservationState {
        if !self.is_closed() && self.is_past_due(now) {
            ReservationState::Expired
        } else {
            self.state
        }
    }

    /// Copy with the derived state applied, for read paths
    pub fn observed(mut self, now: DateTime<Utc>) -> Self {
        self.state = self.state_at(now);
        self
    }

    pub fn extended_by(&self, days: u32) -> AppResult<Self> {
        Ok(Self {
            return_date: days_after(self.return_date, days)?,
            state: ReservationState::Extended,
            extended: true,
            ..self.clone()
        })
    }

    pub fn closed(&self, now: DateTime<Utc>) -> Self {
        Self {
            state: ReservationState::Closed,
            closed_at: Some(now),
            ..self.clone()
        }
    }
}

/// `start` moved forward by whole days, refusing dates chrono cannot represent
fn days_after(start: DateTime<Utc>, days: u32) -> AppResult<DateTime<Utc>> {
    Duration::try_days(days as i64)
        .and_then(|delta| start.checked_add_signed(delta))
        .ok_or_else(|| {
            AppError::Validation(format!("{} days from {} is out of the calendar range", days, start))
        })
}
