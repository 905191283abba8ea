/// Ledger operations: sign-up, sign-in, balance queries, grants, transfers and spending
use crate::{
    account::AccountStore,
    auth::TokenIssuer,
    crypto::PasswordHasher,
    db::account::{Account, ActivityRecord, NewAccount},
    error::{LedgerError, LedgerResult},
    ledger::ActivityLedger,
    metrics,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of an activity grant.
///
/// A non-admin caller is not an error: the request is answered normally with
/// a rejection message and nothing is written.
#[derive(Debug, Clone)]
pub enum ActivityOutcome {
    Recorded(ActivityRecord),
    Rejected(String),
}

impl ActivityOutcome {
    /// Message returned to the caller for either variant
    pub fn message(&self) -> String {
        match self {
            ActivityOutcome::Recorded(record) => {
                format!("Activity name {} has been added", record.activity_type)
            }
            ActivityOutcome::Rejected(reason) => reason.clone(),
        }
    }
}

/// Points service
pub struct PointsService {
    accounts: Arc<AccountStore>,
    activities: Arc<ActivityLedger>,
    tokens: TokenIssuer,
}

impl PointsService {
    pub fn new(
        accounts: Arc<AccountStore>,
        activities: Arc<ActivityLedger>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            accounts,
            activities,
            tokens,
        }
    }

    /// Register a new account with a zero balance
    pub async fn sign_up(
        &self,
        email: &str,
        name: &str,
        role: &str,
        password: &str,
    ) -> LedgerResult<Account> {
        // Only a confirmed absence lets sign-up proceed
        match self.accounts.find_by_email(email).await {
            Ok(_) => {
                metrics::record_operation("sign_up", "conflict");
                return Err(LedgerError::Conflict("user already exists".to_string()));
            }
            Err(LedgerError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let password_hash = PasswordHasher::hash(password)?;

        let account = self
            .accounts
            .create(NewAccount {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                role: role.to_string(),
            })
            .await?;

        metrics::record_operation("sign_up", "ok");
        info!(account_id = account.id, "account created");

        Ok(account)
    }

    /// Check credentials and issue a session token
    pub async fn sign_in(&self, email: &str, password: &str) -> LedgerResult<String> {
        let account = self.accounts.find_by_email(email).await?;

        if !PasswordHasher::verify(&account.password_hash, password)? {
            metrics::record_operation("sign_in", "unauthorized");
            return Err(LedgerError::Authentication("wrong password".to_string()));
        }

        // Sign-in bookkeeping: bumps updated_at only
        self.accounts.touch(account.id).await?;

        let token = self.tokens.issue(&account)?;

        metrics::record_operation("sign_in", "ok");
        info!(account_id = account.id, "session issued");

        Ok(token)
    }

    /// Current balance of an account
    pub async fn get_points(&self, email: &str) -> LedgerResult<f64> {
        let account = self.accounts.find_by_email(email).await?;
        Ok(account.points)
    }

    /// Activity history recorded against an account
    pub async fn list_activities(&self, email: &str) -> LedgerResult<Vec<ActivityRecord>> {
        let account = self.accounts.find_by_email(email).await?;
        self.activities.list_for_user(account.id).await
    }

    /// Record a point-granting activity. Admin only.
    ///
    /// The activity is logged but no balance is credited.
    pub async fn add_activity(
        &self,
        email: &str,
        user_id: Option<i64>,
        activity_type: &str,
        points: f64,
    ) -> LedgerResult<ActivityOutcome> {
        let actor = self.accounts.find_by_email(email).await?;

        if !actor.is_admin() {
            metrics::record_operation("add_activity", "rejected");
            warn!(account_id = actor.id, "non-admin tried to add an activity");
            return Ok(ActivityOutcome::Rejected(
                "you are not allowed to add activities".to_string(),
            ));
        }

        if let Some(target) = user_id {
            self.accounts
                .find_by_id(target)
                .await
                .map_err(|e| rename_not_found(e, "target user not found"))?;
        }

        validate_amount(points)?;

        let record = self
            .activities
            .record(user_id, activity_type, points)
            .await?;

        metrics::record_operation("add_activity", "ok");
        metrics::record_points("granted", points);
        info!(activity_id = record.id, activity_type, "activity recorded");

        Ok(ActivityOutcome::Recorded(record))
    }

    /// Move points from one account to another
    pub async fn send_points(
        &self,
        sender_email: &str,
        receiver_email: &str,
        points: f64,
    ) -> LedgerResult<()> {
        let sender = self
            .accounts
            .find_by_email(sender_email)
            .await
            .map_err(|e| rename_not_found(e, "sender not found"))?;

        let receiver = self
            .accounts
            .find_by_email(receiver_email)
            .await
            .map_err(|e| rename_not_found(e, "receiver not found"))?;

        validate_amount(points)?;

        if sender_email == receiver_email {
            metrics::record_operation("send_points", "conflict");
            return Err(LedgerError::Conflict(
                "sender and receiver are the same user".to_string(),
            ));
        }

        if sender.points < points {
            metrics::record_operation("send_points", "conflict");
            return Err(LedgerError::Conflict(
                "sender doesn't have enough points".to_string(),
            ));
        }

        // Re-checked inside the transaction; a concurrent debit may have won
        self.accounts
            .transfer(sender.id, receiver.id, points)
            .await
            .inspect_err(|e| metrics::record_failure("send_points", e))?;

        metrics::record_operation("send_points", "ok");
        metrics::record_points("transferred", points);
        info!(sender_id = sender.id, receiver_id = receiver.id, points, "points sent");

        Ok(())
    }

    /// Debit points from an account
    pub async fn spend_points(&self, email: &str, points: f64) -> LedgerResult<()> {
        let account = self.accounts.find_by_email(email).await?;

        validate_amount(points)?;

        if account.points < points {
            metrics::record_operation("spend_points", "conflict");
            return Err(LedgerError::Conflict(
                "user doesn't have enough points".to_string(),
            ));
        }

        self.accounts
            .debit(account.id, points)
            .await
            .inspect_err(|e| metrics::record_failure("spend_points", e))?;

        metrics::record_operation("spend_points", "ok");
        metrics::record_points("spent", points);
        info!(account_id = account.id, points, "points spent");

        Ok(())
    }
}

/// Point amounts must be finite and strictly positive
fn validate_amount(points: f64) -> LedgerResult<()> {
    if !points.is_finite() || points <= 0.0 {
        return Err(LedgerError::Validation(
            "points must be a positive number".to_string(),
        ));
    }
    Ok(())
}

fn rename_not_found(err: LedgerError, message: &str) -> LedgerError {
    match err {
        LedgerError::NotFound(_) => LedgerError::NotFound(message.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Duration;
    use sqlx::SqlitePool;
    use tempfile::{tempdir, TempDir};

    struct Harness {
        service: PointsService,
        accounts: Arc<AccountStore>,
        activities: Arc<ActivityLedger>,
        db: SqlitePool,
    }

    fn harness(pool: SqlitePool) -> Harness {
        let accounts = Arc::new(AccountStore::new(pool.clone()));
        let activities = Arc::new(ActivityLedger::new(pool.clone()));
        let tokens = TokenIssuer::new("test-secret-key-for-testing-only", Duration::hours(24));
        let service = PointsService::new(Arc::clone(&accounts), Arc::clone(&activities), tokens);

        Harness {
            service,
            accounts,
            activities,
            db: pool,
        }
    }

    async fn setup() -> Harness {
        let pool = db::create_memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        harness(pool)
    }

    /// File-backed pool with several connections, so requests really overlap
    async fn setup_file_backed() -> (Harness, TempDir) {
        let dir = tempdir().unwrap();
        let pool = db::create_pool(
            &dir.path().join("points.sqlite"),
            db::DatabaseOptions {
                max_connections: 8,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        db::run_migrations(&pool).await.unwrap();
        (harness(pool), dir)
    }

    async fn user_with_points(h: &Harness, email: &str, role: &str, points: f64) -> Account {
        let mut account = h
            .service
            .sign_up(email, "Test User", role, "password123")
            .await
            .unwrap();
        account.points = points;
        h.accounts.save(&account).await.unwrap();
        account
    }

    async fn balance_of(accounts: &AccountStore, email: &str) -> f64 {
        accounts.find_by_email(email).await.unwrap().points
    }

    async fn balance(h: &Harness, email: &str) -> f64 {
        h.service.get_points(email).await.unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let h = setup().await;

        let account = h
            .service
            .sign_up("a@x.com", "Alice", "user", "password123")
            .await
            .unwrap();
        assert_eq!(account.points, 0.0);
        assert_ne!(account.password_hash, "password123");

        let token = h.service.sign_in("a@x.com", "password123").await.unwrap();
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_is_conflict_without_mutation() {
        let h = setup().await;
        h.service
            .sign_up("a@x.com", "Alice", "user", "password123")
            .await
            .unwrap();
        let before = h.accounts.find_by_email("a@x.com").await.unwrap();

        let result = h
            .service
            .sign_up("a@x.com", "Mallory", "admin", "other-password")
            .await;
        match result {
            Err(LedgerError::Conflict(msg)) => assert_eq!(msg, "user already exists"),
            other => panic!("Expected Conflict error, got {:?}", other),
        }

        let after = h.accounts.find_by_email("a@x.com").await.unwrap();
        assert_eq!(after.name, before.name);
        assert_eq!(after.role, before.role);
        assert_eq!(after.password_hash, before.password_hash);
        assert_eq!(h.accounts.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_unknown_user() {
        let h = setup().await;
        match h.service.sign_in("ghost@x.com", "password123").await {
            Err(LedgerError::NotFound(msg)) => assert_eq!(msg, "user not found"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let h = setup().await;
        h.service
            .sign_up("a@x.com", "Alice", "user", "password123")
            .await
            .unwrap();

        match h.service.sign_in("a@x.com", "password124").await {
            Err(LedgerError::Authentication(msg)) => assert_eq!(msg, "wrong password"),
            other => panic!("Expected Authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_points_unknown_email() {
        let h = setup().await;
        assert!(matches!(
            h.service.get_points("ghost@x.com").await,
            Err(LedgerError::NotFound(_))
        ));
        assert_eq!(h.accounts.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_points_scenario() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 100.0).await;
        user_with_points(&h, "b@x.com", "user", 0.0).await;

        h.service.send_points("a@x.com", "b@x.com", 30.0).await.unwrap();

        assert_eq!(balance(&h, "a@x.com").await, 70.0);
        assert_eq!(balance(&h, "b@x.com").await, 30.0);
    }

    #[tokio::test]
    async fn test_send_points_conserves_total() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 12.5).await;
        user_with_points(&h, "b@x.com", "user", 7.25).await;

        for amount in [0.25, 3.0, 9.25] {
            let before = balance(&h, "a@x.com").await + balance(&h, "b@x.com").await;
            h.service.send_points("a@x.com", "b@x.com", amount).await.unwrap();
            let after = balance(&h, "a@x.com").await + balance(&h, "b@x.com").await;
            assert!((before - after).abs() < 1e-9);
        }
        assert_eq!(balance(&h, "a@x.com").await, 0.0);
    }

    #[tokio::test]
    async fn test_send_points_insufficient() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;
        user_with_points(&h, "b@x.com", "user", 5.0).await;

        match h.service.send_points("a@x.com", "b@x.com", 10.5).await {
            Err(LedgerError::Conflict(msg)) => assert_eq!(msg, "sender doesn't have enough points"),
            other => panic!("Expected Conflict error, got {:?}", other),
        }
        assert_eq!(balance(&h, "a@x.com").await, 10.0);
        assert_eq!(balance(&h, "b@x.com").await, 5.0);
    }

    #[tokio::test]
    async fn test_send_points_to_self() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;

        match h.service.send_points("a@x.com", "a@x.com", 1.0).await {
            Err(LedgerError::Conflict(msg)) => {
                assert_eq!(msg, "sender and receiver are the same user")
            }
            other => panic!("Expected Conflict error, got {:?}", other),
        }
        assert_eq!(balance(&h, "a@x.com").await, 10.0);
    }

    #[tokio::test]
    async fn test_send_points_missing_parties() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;

        match h.service.send_points("ghost@x.com", "a@x.com", 1.0).await {
            Err(LedgerError::NotFound(msg)) => assert_eq!(msg, "sender not found"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
        match h.service.send_points("a@x.com", "ghost@x.com", 1.0).await {
            Err(LedgerError::NotFound(msg)) => assert_eq!(msg, "receiver not found"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
        assert_eq!(balance(&h, "a@x.com").await, 10.0);
    }

    #[tokio::test]
    async fn test_spend_points_scenario() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;

        match h.service.spend_points("a@x.com", 50.0).await {
            Err(LedgerError::Conflict(msg)) => assert_eq!(msg, "user doesn't have enough points"),
            other => panic!("Expected Conflict error, got {:?}", other),
        }
        assert_eq!(balance(&h, "a@x.com").await, 10.0);

        h.service.spend_points("a@x.com", 4.0).await.unwrap();
        assert_eq!(balance(&h, "a@x.com").await, 6.0);
    }

    #[tokio::test]
    async fn test_invalid_amounts_rejected() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;
        user_with_points(&h, "b@x.com", "user", 0.0).await;

        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                h.service.spend_points("a@x.com", amount).await,
                Err(LedgerError::Validation(_))
            ));
            assert!(matches!(
                h.service.send_points("a@x.com", "b@x.com", amount).await,
                Err(LedgerError::Validation(_))
            ));
        }
        assert_eq!(balance(&h, "a@x.com").await, 10.0);
        assert_eq!(balance(&h, "b@x.com").await, 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_spends_never_overdraw() {
        let (h, _dir) = setup_file_backed().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;
        let service = Arc::new(h.service);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.spend_points("a@x.com", 4.0).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => succeeded += 1,
                Err(LedgerError::Conflict(_)) => {}
                Err(e) => panic!("Unexpected error: {:?}", e),
            }
        }

        assert_eq!(succeeded, 2);
        assert_eq!(balance_of(&h.accounts, "a@x.com").await, 2.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_conserve_total() {
        let (h, _dir) = setup_file_backed().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;
        user_with_points(&h, "b@x.com", "user", 0.0).await;
        user_with_points(&h, "c@x.com", "user", 0.0).await;
        let service = Arc::new(h.service);

        let mut transfers = Vec::new();
        for i in 0..8 {
            let service = Arc::clone(&service);
            let receiver = if i % 2 == 0 { "b@x.com" } else { "c@x.com" };
            transfers.push(tokio::spawn(async move {
                service.send_points("a@x.com", receiver, 3.0).await
            }));
        }
        // Spends race the transfers out of the same account
        let mut spends = Vec::new();
        for _ in 0..4 {
            let service = Arc::clone(&service);
            spends.push(tokio::spawn(async move {
                service.spend_points("a@x.com", 1.0).await
            }));
        }

        let mut sent = 0.0;
        for handle in transfers {
            match handle.await.unwrap() {
                Ok(()) => sent += 3.0,
                Err(LedgerError::Conflict(_)) => {}
                Err(e) => panic!("Unexpected error: {:?}", e),
            }
        }
        let mut spent = 0.0;
        for handle in spends {
            match handle.await.unwrap() {
                Ok(()) => spent += 1.0,
                Err(LedgerError::Conflict(_)) => {}
                Err(e) => panic!("Unexpected error: {:?}", e),
            }
        }

        let a = balance_of(&h.accounts, "a@x.com").await;
        let b = balance_of(&h.accounts, "b@x.com").await;
        let c = balance_of(&h.accounts, "c@x.com").await;

        assert!(a >= 0.0);
        assert!(sent > 0.0);
        assert_eq!(b + c, sent);
        assert_eq!(a, 10.0 - sent - spent);
        assert_eq!(a + b + c + spent, 10.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sign_in_does_not_undo_concurrent_spend() {
        let (h, _dir) = setup_file_backed().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;
        let service = Arc::new(h.service);

        // Password verification is slow; the spend lands while it runs
        let sign_in = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.sign_in("a@x.com", "password123").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        service.spend_points("a@x.com", 4.0).await.unwrap();

        let token = sign_in.await.unwrap().unwrap();
        assert!(!token.is_empty());
        assert_eq!(balance_of(&h.accounts, "a@x.com").await, 6.0);
    }

    #[tokio::test]
    async fn test_add_activity_by_admin() {
        let h = setup().await;
        user_with_points(&h, "admin@x.com", "admin", 0.0).await;
        let target = user_with_points(&h, "b@x.com", "user", 0.0).await;

        let outcome = h
            .service
            .add_activity("admin@x.com", Some(target.id), "recycling", 20.0)
            .await
            .unwrap();

        match &outcome {
            ActivityOutcome::Recorded(record) => {
                assert_eq!(record.user_id, Some(target.id));
                assert_eq!(record.points, 20.0);
            }
            other => panic!("Expected Recorded outcome, got {:?}", other),
        }
        assert_eq!(outcome.message(), "Activity name recycling has been added");

        // Ledger only: the target balance is untouched
        assert_eq!(balance(&h, "b@x.com").await, 0.0);
        assert_eq!(h.activities.count().await.unwrap(), 1);

        let history = h.service.list_activities("b@x.com").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].activity_type, "recycling");
    }

    #[tokio::test]
    async fn test_add_activity_by_non_admin_is_soft_rejection() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 0.0).await;

        let outcome = h
            .service
            .add_activity("a@x.com", None, "recycling", 20.0)
            .await
            .unwrap();

        assert!(matches!(outcome, ActivityOutcome::Rejected(_)));
        assert_eq!(outcome.message(), "you are not allowed to add activities");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_history")
            .fetch_one(&h.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_add_activity_unknown_actor_or_target() {
        let h = setup().await;
        user_with_points(&h, "admin@x.com", "admin", 0.0).await;

        match h.service.add_activity("ghost@x.com", None, "x", 1.0).await {
            Err(LedgerError::NotFound(msg)) => assert_eq!(msg, "user not found"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
        match h.service.add_activity("admin@x.com", Some(404), "x", 1.0).await {
            Err(LedgerError::NotFound(msg)) => assert_eq!(msg, "target user not found"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
        assert_eq!(h.activities.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_account_wins_over_bad_amount() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;

        match h.service.spend_points("ghost@x.com", 0.0).await {
            Err(LedgerError::NotFound(msg)) => assert_eq!(msg, "user not found"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
        match h.service.send_points("a@x.com", "ghost@x.com", -1.0).await {
            Err(LedgerError::NotFound(msg)) => assert_eq!(msg, "receiver not found"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }

        // Non-admins get the rejection message whatever the amount
        let outcome = h
            .service
            .add_activity("a@x.com", None, "recycling", 0.0)
            .await
            .unwrap();
        assert!(matches!(outcome, ActivityOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_mistaken_for_not_found() {
        let h = setup().await;
        user_with_points(&h, "a@x.com", "user", 10.0).await;
        h.db.close().await;

        let result = h
            .service
            .sign_up("b@x.com", "Bob", "user", "password123")
            .await;
        match result {
            Err(e @ LedgerError::Database(_)) => assert!(e.is_internal()),
            other => panic!("Expected Database error, got {:?}", other),
        }

        assert!(matches!(
            h.service.send_points("a@x.com", "b@x.com", 1.0).await,
            Err(LedgerError::Database(_))
        ));
        assert!(matches!(
            h.service.get_points("a@x.com").await,
            Err(LedgerError::Database(_))
        ));
        assert!(matches!(
            h.service.sign_in("a@x.com", "password123").await,
            Err(LedgerError::Database(_))
        ));
    }
}
