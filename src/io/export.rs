use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::LedgerService;
use crate::domain::{format_cents, totals, Statement, UserId};

/// Statement history snapshot for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct StatementSnapshot {
    pub user_id: UserId,
    pub exported_at: DateTime<Utc>,
    pub statements: Vec<Statement>,
    pub total_deposits: String,
    pub total_withdrawals: String,
    pub balance: String,
}

/// Exporter for a user's statement history
pub struct Exporter<'a> {
    ledger: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(ledger: &'a LedgerService) -> Self {
        Self { ledger }
    }

    /// Export statements to CSV format. Returns the number of rows written.
    pub async fn export_statements_csv<W: Write>(&self, user_id: UserId, writer: W) -> Result<usize> {
        let view = self.ledger.get_balance(user_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "created_at", "type", "amount", "description"])?;

        for statement in &view.statements {
            csv_writer.write_record([
                statement.id.to_string(),
                statement.created_at.to_rfc3339(),
                statement.kind.as_str().to_string(),
                format_cents(statement.amount_cents),
                statement.description.clone(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(view.statements.len())
    }

    /// Export statements plus totals as pretty-printed JSON.
    pub async fn export_statements_json<W: Write>(
        &self,
        user_id: UserId,
        writer: W,
    ) -> Result<usize> {
        let view = self.ledger.get_balance(user_id).await?;
        let (deposits, withdrawals) = totals(&view.statements)?;
        let count = view.statements.len();

        let snapshot = StatementSnapshot {
            user_id,
            exported_at: Utc::now(),
            statements: view.statements,
            total_deposits: format_cents(deposits),
            total_withdrawals: format_cents(withdrawals),
            balance: format_cents(view.balance),
        };

        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(count)
    }
}
