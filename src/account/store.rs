/// Account store implementation using runtime queries
/// Uses sqlx runtime query building instead of compile-time macros
/// to avoid needing DATABASE_URL during compilation
use crate::{
    db::account::{Account, NewAccount},
    error::{LedgerError, LedgerResult},
};
use chrono::Utc;
use sqlx::SqlitePool;

const ACCOUNT_COLUMNS: &str =
    "id, name, email, password_hash, role, points, created_at, updated_at";

/// Account store service
pub struct AccountStore {
    db: SqlitePool,
}

impl AccountStore {
    /// Create a new account store
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Get account by email
    ///
    /// A missing row is `NotFound`; every other failure is `Database`. Callers
    /// branch on the difference, since absence is often the expected answer.
    pub async fn find_by_email(&self, email: &str) -> LedgerResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE email = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("user not found".to_string()))
    }

    /// Get account by id
    pub async fn find_by_id(&self, id: i64) -> LedgerResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("user not found".to_string()))
    }

    /// Insert a new account with a zero balance and return the stored record
    pub async fn create(&self, account: NewAccount) -> LedgerResult<Account> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO account (name, email, password_hash, role, points, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.role)
        .bind(0.0_f64)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            // A concurrent sign-up won the race past the existence check
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                LedgerError::Conflict("user already exists".to_string())
            }
            other => LedgerError::Database(other),
        })?;

        Ok(Account {
            id: result.last_insert_rowid(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            points: 0.0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Persist an updated account and bump its `updated_at`
    pub async fn save(&self, account: &Account) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE account
             SET name = ?1, password_hash = ?2, role = ?3, points = ?4, updated_at = ?5
             WHERE id = ?6",
        )
        .bind(&account.name)
        .bind(&account.password_hash)
        .bind(&account.role)
        .bind(account.points)
        .bind(Utc::now())
        .bind(account.id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("user not found".to_string()));
        }

        Ok(())
    }

    /// Bump `updated_at` without touching any other column.
    ///
    /// Sign-in bookkeeping goes through here rather than `save`, which would
    /// write back a possibly stale balance.
    pub async fn touch(&self, id: i64) -> LedgerResult<()> {
        let result = sqlx::query("UPDATE account SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("user not found".to_string()));
        }

        Ok(())
    }

    /// Debit an account only if it still holds at least `amount` points.
    ///
    /// The balance check and the write are one statement, so concurrent
    /// debits cannot both pass against the same balance.
    pub async fn debit(&self, id: i64, amount: f64) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE account SET points = points - ?1, updated_at = ?2
             WHERE id = ?3 AND points >= ?1",
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::Conflict(
                "user doesn't have enough points".to_string(),
            ));
        }

        Ok(())
    }

    /// Move points from one account to another in a single transaction.
    ///
    /// The sender debit is conditional on its balance; if it touches no row the
    /// transaction is rolled back and neither account changes.
    pub async fn transfer(&self, sender_id: i64, receiver_id: i64, amount: f64) -> LedgerResult<()> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let debited = sqlx::query(
            "UPDATE account SET points = points - ?1, updated_at = ?2
             WHERE id = ?3 AND points >= ?1",
        )
        .bind(amount)
        .bind(now)
        .bind(sender_id)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(LedgerError::Conflict(
                "sender doesn't have enough points".to_string(),
            ));
        }

        let credited = sqlx::query(
            "UPDATE account SET points = points + ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(amount)
        .bind(now)
        .bind(receiver_id)
        .execute(&mut *tx)
        .await?;

        if credited.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(LedgerError::NotFound("receiver not found".to_string()));
        }

        tx.commit().await?;

        Ok(())
    }

    /// Total number of accounts
    pub async fn count(&self) -> LedgerResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account")
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}
