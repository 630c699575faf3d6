//! Reader model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Reader as known to the directory. Credentials live with the identity
/// provider, not here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reader {
    pub id: Uuid,
    pub fio: String,
    pub phone_number: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
}

/// Register reader request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReader {
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub fio: String,
    #[validate(length(min = 5, max = 20, message = "Phone number must be 5-20 characters"))]
    pub phone_number: String,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: i32,
}

impl NewReader {
    pub fn into_reader(self, now: DateTime<Utc>) -> Reader {
        Reader {
            id: Uuid::new_v4(),
            fio: self.fio,
            phone_number: self.phone_number,
            age: self.age,
            created_at: now,
        }
    }
}
