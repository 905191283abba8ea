/// Account and activity database models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role value that may record activities
pub const ADMIN_ROLE: &str = "admin";

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Free-form role; only `admin` carries privileges
    pub role: String,
    pub points: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Fields supplied at sign-up; id, balance and timestamps are assigned on insert
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Activity history record (append-only)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub user_id: Option<i64>,
    pub activity_type: String,
    pub points: f64,
    pub created_at: DateTime<Utc>,
}
