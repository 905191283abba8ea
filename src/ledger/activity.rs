/// Append-only activity history
use crate::{db::account::ActivityRecord, error::LedgerResult};
use chrono::Utc;
use sqlx::SqlitePool;

/// Records point-granting events. Rows are only ever inserted.
pub struct ActivityLedger {
    db: SqlitePool,
}

impl ActivityLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append an activity record and return it
    pub async fn record(
        &self,
        user_id: Option<i64>,
        activity_type: &str,
        points: f64,
    ) -> LedgerResult<ActivityRecord> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO activity_history (user_id, activity_type, points, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(user_id)
        .bind(activity_type)
        .bind(points)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(ActivityRecord {
            id: result.last_insert_rowid(),
            user_id,
            activity_type: activity_type.to_string(),
            points,
            created_at: now,
        })
    }

    /// Activities recorded for one account, newest first
    pub async fn list_for_user(&self, user_id: i64) -> LedgerResult<Vec<ActivityRecord>> {
        let records = sqlx::query_as::<_, ActivityRecord>(
            "SELECT id, user_id, activity_type, points, created_at
             FROM activity_history
             WHERE user_id = ?1
             ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }

    /// Total number of recorded activities
    pub async fn count(&self) -> LedgerResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_history")
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}
