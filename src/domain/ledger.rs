use serde::Serialize;
use thiserror::Error;

use super::{Cents, OperationType, Statement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("running total exceeds the representable amount")]
    Overflow,
}

/// Balance = sum of deposits - sum of withdrawals.
pub fn compute_balance(statements: &[Statement]) -> Result<Cents, LedgerError> {
    statements.iter().try_fold(0, |balance: Cents, statement| {
        balance
            .checked_add(statement.signed_amount())
            .ok_or(LedgerError::Overflow)
    })
}

/// Balance after depositing `amount` on top of `balance`.
pub fn balance_after_deposit(balance: Cents, amount: Cents) -> Result<Cents, LedgerError> {
    balance.checked_add(amount).ok_or(LedgerError::Overflow)
}

/// Returns true when a withdrawal of `amount` is covered by `balance`.
pub fn can_withdraw(balance: Cents, amount: Cents) -> bool {
    amount <= balance
}

/// Totals per operation type, handy for summaries.
pub fn totals(statements: &[Statement]) -> Result<(Cents, Cents), LedgerError> {
    statements
        .iter()
        .try_fold((0, 0), |(deposits, withdrawals): (Cents, Cents), s| {
            let sums = match s.kind {
                OperationType::Deposit => deposits
                    .checked_add(s.amount_cents)
                    .map(|d| (d, withdrawals)),
                OperationType::Withdraw => withdrawals
                    .checked_add(s.amount_cents)
                    .map(|w| (deposits, w)),
            };
            sums.ok_or(LedgerError::Overflow)
        })
}

/// A user's statements together with the derived balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub statements: Vec<Statement>,
    pub balance: Cents,
}

impl Balance {
    pub fn from_statements(statements: Vec<Statement>) -> Result<Self, LedgerError> {
        let balance = compute_balance(&statements)?;
        Ok(Self {
            statements,
            balance,
        })
    }
}
