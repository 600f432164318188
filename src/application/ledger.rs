use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use crate::domain::{
    balance_after_deposit, can_withdraw, compute_balance, Balance, Cents, OperationType,
    Statement, StatementId, User, UserId,
};
use crate::storage::{StatementsRepository, UsersRepository};

use super::AppError;

/// Balance accounting and withdrawal authorization for a user's statements.
///
/// Statement creation for the same user is serialized: the balance check and
/// the insert run under a per-user lock, so concurrent requests cannot both
/// pass the check against the same balance. The lock is in-process only and
/// its table entry is dropped once nobody holds or awaits it.
pub struct LedgerService {
    users: Arc<dyn UsersRepository>,
    statements: Arc<dyn StatementsRepository>,
    user_locks: LockTable,
}

type LockTable = Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>;

/// A claim on one user's entry in the lock table.
struct LockLease<'a> {
    table: &'a LockTable,
    user_id: UserId,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the table and this lease still point at the lock
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.user_id);
        }
    }
}

impl LedgerService {
    pub fn new(users: Arc<dyn UsersRepository>, statements: Arc<dyn StatementsRepository>) -> Self {
        Self {
            users,
            statements,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// All of a user's statements plus the freshly computed balance.
    #[tracing::instrument(skip(self))]
    pub async fn get_balance(&self, user_id: UserId) -> Result<Balance, AppError> {
        self.require_user(user_id).await?;
        let statements = self.statements.list_by_user(user_id).await?;
        Ok(Balance::from_statements(statements)?)
    }

    /// Record a deposit or withdrawal.
    ///
    /// Withdrawals larger than the current balance are rejected with
    /// `InsufficientFunds`, and deposits that would push the balance past
    /// `Cents::MAX` with `InvalidAmount`. Neither leaves a statement behind.
    #[tracing::instrument(skip(self, description))]
    pub async fn create_statement(
        &self,
        user_id: UserId,
        kind: OperationType,
        amount_cents: Cents,
        description: &str,
    ) -> Result<Statement, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        self.require_user(user_id).await?;

        let lease = self.lease(user_id);
        let _guard = lease.lock.lock().await;

        let balance = self.current_balance(user_id).await?;
        match kind {
            OperationType::Deposit => {
                if balance_after_deposit(balance, amount_cents).is_err() {
                    tracing::info!(balance, amount = amount_cents, "deposit rejected");
                    return Err(AppError::InvalidAmount(
                        "Deposit would exceed the maximum balance".to_string(),
                    ));
                }
            }
            OperationType::Withdraw => {
                if !can_withdraw(balance, amount_cents) {
                    tracing::info!(balance, required = amount_cents, "withdrawal rejected");
                    return Err(AppError::InsufficientFunds {
                        balance,
                        required: amount_cents,
                    });
                }
            }
        }

        let statement = self
            .statements
            .create(user_id, kind, amount_cents, description)
            .await?;

        tracing::info!(statement_id = %statement.id, "statement recorded");
        Ok(statement)
    }

    /// Look up one of the user's statements.
    ///
    /// A statement owned by someone else is reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn get_statement_operation(
        &self,
        user_id: UserId,
        statement_id: StatementId,
    ) -> Result<Statement, AppError> {
        self.require_user(user_id).await?;

        self.statements
            .find_by_id(statement_id)
            .await?
            .filter(|statement| statement.belongs_to(user_id))
            .ok_or_else(|| AppError::StatementNotFound(statement_id.to_string()))
    }

    async fn require_user(&self, user_id: UserId) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    async fn current_balance(&self, user_id: UserId) -> Result<Cents, AppError> {
        let statements = self.statements.list_by_user(user_id).await?;
        Ok(compute_balance(&statements)?)
    }

    fn lease(&self, user_id: UserId) -> LockLease<'_> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        LockLease {
            table: &self.user_locks,
            user_id,
            lock: locks.entry(user_id).or_default().clone(),
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::storage::{InMemoryStatementsRepository, InMemoryUsersRepository};

    struct Fixture {
        ledger: Arc<LedgerService>,
        users: Arc<InMemoryUsersRepository>,
        statements: Arc<InMemoryStatementsRepository>,
        user: User,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUsersRepository::new());
        let statements = Arc::new(InMemoryStatementsRepository::new());
        let user = users
            .create("Marcelo", "marcelo@example.com", "hash")
            .await
            .unwrap();
        let ledger = Arc::new(LedgerService::new(users.clone(), statements.clone()));
        Fixture {
            ledger,
            users,
            statements,
            user,
        }
    }

    #[tokio::test]
    async fn test_new_user_has_zero_balance() {
        let f = fixture().await;
        let balance = f.ledger.get_balance(f.user.id).await.unwrap();

        assert_eq!(balance.balance, 0);
        assert!(balance.statements.is_empty());
    }

    #[tokio::test]
    async fn test_deposit_then_withdraw_full_amount() {
        let f = fixture().await;
        f.ledger
            .create_statement(f.user.id, OperationType::Deposit, 20000, "Statement test")
            .await
            .unwrap();
        let withdraw = f
            .ledger
            .create_statement(f.user.id, OperationType::Withdraw, 20000, "Statement test")
            .await
            .unwrap();

        assert_eq!(withdraw.kind, OperationType::Withdraw);
        assert_eq!(f.ledger.get_balance(f.user.id).await.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_no_statement() {
        let f = fixture().await;
        f.ledger
            .create_statement(f.user.id, OperationType::Deposit, 20000, "salary")
            .await
            .unwrap();

        let result = f
            .ledger
            .create_statement(f.user.id, OperationType::Withdraw, 50000, "car")
            .await;

        assert!(matches!(
            result,
            Err(AppError::InsufficientFunds {
                balance: 20000,
                required: 50000
            })
        ));
        assert_eq!(f.statements.list_by_user(f.user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let f = fixture().await;

        for amount in [0, -100] {
            let result = f
                .ledger
                .create_statement(f.user.id, OperationType::Deposit, amount, "bad")
                .await;
            assert!(matches!(result, Err(AppError::InvalidAmount(_))));
        }
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let f = fixture().await;
        let ghost = Uuid::new_v4();

        assert!(matches!(
            f.ledger.get_balance(ghost).await,
            Err(AppError::UserNotFound(_))
        ));
        assert!(matches!(
            f.ledger
                .create_statement(ghost, OperationType::Deposit, 100, "")
                .await,
            Err(AppError::UserNotFound(_))
        ));
        assert!(matches!(
            f.ledger.get_statement_operation(ghost, Uuid::new_v4()).await,
            Err(AppError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_statement_operation_returns_created_statement() {
        let f = fixture().await;
        let created = f
            .ledger
            .create_statement(f.user.id, OperationType::Deposit, 20000, "Statement test")
            .await
            .unwrap();

        let fetched = f
            .ledger
            .get_statement_operation(f.user.id, created.id)
            .await
            .unwrap();

        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_statement_of_other_user_is_not_found() {
        let f = fixture().await;
        let other = f
            .users
            .create("Other", "other@example.com", "hash")
            .await
            .unwrap();
        let theirs = f
            .ledger
            .create_statement(other.id, OperationType::Deposit, 100, "private")
            .await
            .unwrap();

        let result = f.ledger.get_statement_operation(f.user.id, theirs.id).await;
        match result {
            Err(AppError::StatementNotFound(id)) => assert_eq!(id, theirs.id.to_string()),
            other => panic!("expected StatementNotFound, got {:?}", other),
        }

        let missing = f
            .ledger
            .get_statement_operation(f.user.id, Uuid::new_v4())
            .await;
        assert!(matches!(missing, Err(AppError::StatementNotFound(_))));
    }

    #[tokio::test]
    async fn test_deleted_user_is_not_found() {
        let f = fixture().await;
        f.ledger
            .create_statement(f.user.id, OperationType::Deposit, 100, "")
            .await
            .unwrap();

        f.users.delete(f.user.id).await.unwrap();

        assert!(matches!(
            f.ledger.get_balance(f.user.id).await,
            Err(AppError::UserNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_withdrawals_never_overdraw() {
        let f = fixture().await;
        f.ledger
            .create_statement(f.user.id, OperationType::Deposit, 1000, "seed")
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = f.ledger.clone();
            let user_id = f.user.id;
            handles.push(tokio::spawn(async move {
                ledger
                    .create_statement(user_id, OperationType::Withdraw, 100, "race")
                    .await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 10);
        assert_eq!(f.ledger.get_balance(f.user.id).await.unwrap().balance, 0);
        assert_eq!(f.ledger.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_deposit_that_would_overflow_balance_is_rejected() {
        let f = fixture().await;
        let huge = crate::domain::parse_cents("90000000000000000").unwrap();

        f.ledger
            .create_statement(f.user.id, OperationType::Deposit, huge, "first")
            .await
            .unwrap();
        let result = f
            .ledger
            .create_statement(f.user.id, OperationType::Deposit, huge, "second")
            .await;

        assert!(matches!(result, Err(AppError::InvalidAmount(_))));
        assert_eq!(f.statements.list_by_user(f.user.id).await.unwrap().len(), 1);
        assert_eq!(f.ledger.get_balance(f.user.id).await.unwrap().balance, huge);
    }

    #[tokio::test]
    async fn test_unrepresentable_history_is_an_error() {
        let f = fixture().await;
        let huge = crate::domain::parse_cents("90000000000000000").unwrap();

        // Written straight to the store, bypassing the deposit check
        for _ in 0..2 {
            f.statements
                .create(f.user.id, OperationType::Deposit, huge, "imported")
                .await
                .unwrap();
        }

        assert!(matches!(
            f.ledger.get_balance(f.user.id).await,
            Err(AppError::Ledger(_))
        ));
        assert!(matches!(
            f.ledger
                .create_statement(f.user.id, OperationType::Withdraw, 1, "")
                .await,
            Err(AppError::Ledger(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_table_is_emptied_after_each_statement() {
        let f = fixture().await;

        f.ledger
            .create_statement(f.user.id, OperationType::Deposit, 100, "")
            .await
            .unwrap();
        assert_eq!(f.ledger.tracked_locks(), 0);

        let rejected = f
            .ledger
            .create_statement(f.user.id, OperationType::Withdraw, 500, "")
            .await;
        assert!(rejected.is_err());
        assert_eq!(f.ledger.tracked_locks(), 0);
    }
}
