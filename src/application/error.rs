use thiserror::Error;

use crate::domain::{Cents, LedgerError};
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// Deliberately silent about which of the two fields was wrong.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Statement not found: {0}")]
    StatementNotFound(String),

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Cents, required: Cents },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Credential processing failed: {0}")]
    Crypto(String),

    /// Stored history whose totals cannot be represented.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateEmail(email) => AppError::DuplicateEmail(email),
            StorageError::Backend(e) => AppError::Database(e),
        }
    }
}
