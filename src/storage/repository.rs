use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Cents, OperationType, Statement, StatementId, User, UserId};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Persistence for user accounts.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Insert a new user. Fails with `DuplicateEmail` before writing anything
    /// if the email is already taken.
    async fn create(&self, name: &str, email: &str, password_hash: &str) -> StorageResult<User>;

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> StorageResult<Option<User>>;

    /// Remove a user. Returns false if no such user existed.
    /// Statements owned by the user are left untouched.
    async fn delete(&self, id: UserId) -> StorageResult<bool>;

    /// All users, oldest first.
    async fn list(&self) -> StorageResult<Vec<User>>;
}

/// Append-only persistence for statements.
#[async_trait]
pub trait StatementsRepository: Send + Sync {
    async fn create(
        &self,
        user_id: UserId,
        kind: OperationType,
        amount_cents: Cents,
        description: &str,
    ) -> StorageResult<Statement>;

    async fn find_by_id(&self, id: StatementId) -> StorageResult<Option<Statement>>;

    /// Statements for a user in insertion order.
    async fn list_by_user(&self, user_id: UserId) -> StorageResult<Vec<Statement>>;
}
