use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, UserId};

pub type StatementId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Money entering the account
    Deposit,
    /// Money leaving the account
    Withdraw,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Deposit => "deposit",
            OperationType::Withdraw => "withdraw",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(OperationType::Deposit),
            "withdraw" => Some(OperationType::Withdraw),
            _ => None,
        }
    }

    /// Sign applied to the amount when folding statements into a balance.
    pub fn sign(&self) -> Cents {
        match self {
            OperationType::Deposit => 1,
            OperationType::Withdraw => -1,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single deposit or withdrawal against a user's balance.
/// Statements are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    /// Owner of the statement
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: OperationType,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Statement {
    /// Create a new statement stamped with the current time.
    pub fn new(
        user_id: UserId,
        kind: OperationType,
        amount_cents: Cents,
        description: impl Into<String>,
    ) -> Self {
        assert!(amount_cents > 0, "Statement amount must be positive");
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            amount_cents,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    /// Signed contribution of this statement to the balance.
    pub fn signed_amount(&self) -> Cents {
        self.kind.sign() * self.amount_cents
    }

    pub fn belongs_to(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_parse() {
        assert_eq!(OperationType::from_str("deposit"), Some(OperationType::Deposit));
        assert_eq!(OperationType::from_str("WITHDRAW"), Some(OperationType::Withdraw));
        assert_eq!(OperationType::from_str("transfer"), None);
    }

    #[test]
    fn test_signed_amount() {
        let user = Uuid::new_v4();
        let deposit = Statement::new(user, OperationType::Deposit, 2000, "salary");
        let withdraw = Statement::new(user, OperationType::Withdraw, 500, "rent");

        assert_eq!(deposit.signed_amount(), 2000);
        assert_eq!(withdraw.signed_amount(), -500);
    }

    #[test]
    fn test_belongs_to() {
        let owner = Uuid::new_v4();
        let statement = Statement::new(owner, OperationType::Deposit, 100, "");

        assert!(statement.belongs_to(owner));
        assert!(!statement.belongs_to(Uuid::new_v4()));
    }

    #[test]
    #[should_panic(expected = "Statement amount must be positive")]
    fn test_statement_requires_positive_amount() {
        Statement::new(Uuid::new_v4(), OperationType::Deposit, 0, "zero");
    }
}
