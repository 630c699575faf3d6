//! Library card model

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Digits in a printed card number
pub const CARD_NUMBER_LEN: usize = 13;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LibCard {
    pub id: Uuid,
    pub reader_id: Uuid,
    pub number: String,
    pub issue_date: DateTime<Utc>,
    pub validity_days: i32,
    pub active: bool,
}

impl LibCard {
    /// Issue a fresh, active card
    pub fn issue(reader_id: Uuid, validity_days: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reader_id,
            number: generate_card_number(),
            issue_date: now,
            validity_days,
            active: true,
        }
    }

    /// `None` when the window runs past the last representable date
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Duration::try_days(self.validity_days as i64)
            .and_then(|validity| self.issue_date.checked_add_signed(validity))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| now > expires_at)
    }

    /// Active and not expired
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }

    /// Renewal is only allowed once the card stopped being valid
    pub fn can_renew(&self, now: DateTime<Utc>) -> bool {
        !self.is_valid(now)
    }

    pub fn renewed(&self, validity_days: i32, now: DateTime<Utc>) -> Self {
        Self {
            issue_date: now,
            validity_days,
            active: true,
            ..self.clone()
        }
    }
}

fn generate_card_number() -> String {
    let mut rng = rand::thread_rng();
    // No leading zero so the number survives numeric round-trips
    let first = rng.gen_range(1..=9u8);
    let rest: String = (1..CARD_NUMBER_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..=9u8)))
        .collect();
    format!("{}{}", first, rest)
}
