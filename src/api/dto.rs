//! Request/response bodies and their mapping from domain types.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::application::Session;
use crate::domain::{format_cents, parse_cents, Balance, Cents, OperationType, Statement, User, UserId};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct StatementRequest {
    /// Accepts `120`, `120.5` or `"120.50"`
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Cents,
    #[serde(default)]
    pub description: String,
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Cents, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        other => {
            return Err(de::Error::custom(format!(
                "amount must be a number or decimal string, got {}",
                other
            )));
        }
    };
    parse_cents(&text).map_err(de::Error::custom)
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            user: session.user.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatementResponse {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub amount: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<Statement> for StatementResponse {
    fn from(statement: Statement) -> Self {
        Self {
            id: statement.id.to_string(),
            user_id: statement.user_id.to_string(),
            kind: statement.kind,
            amount: format_cents(statement.amount_cents),
            description: statement.description,
            created_at: statement.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub statements: Vec<StatementResponse>,
    pub balance: String,
}

impl From<Balance> for BalanceResponse {
    fn from(view: Balance) -> Self {
        Self {
            statements: view.statements.into_iter().map(Into::into).collect(),
            balance: format_cents(view.balance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount_of(json: &str) -> Result<Cents, serde_json::Error> {
        serde_json::from_str::<StatementRequest>(json).map(|r| r.amount)
    }

    #[test]
    fn test_amount_accepts_numbers_and_strings() {
        assert_eq!(amount_of(r#"{"amount": 120}"#).unwrap(), 12000);
        assert_eq!(amount_of(r#"{"amount": 120.5}"#).unwrap(), 12050);
        assert_eq!(amount_of(r#"{"amount": "0.99"}"#).unwrap(), 99);
        assert_eq!(amount_of(r#"{"amount": -3}"#).unwrap(), -300);
    }

    #[test]
    fn test_amount_rejects_garbage() {
        assert!(amount_of(r#"{"amount": "ten"}"#).is_err());
        assert!(amount_of(r#"{"amount": true}"#).is_err());
        assert!(amount_of(r#"{"description": "no amount"}"#).is_err());
    }

    #[test]
    fn test_description_defaults_to_empty() {
        let request: StatementRequest = serde_json::from_str(r#"{"amount": 1}"#).unwrap();
        assert_eq!(request.description, "");
    }

    #[test]
    fn test_statement_response_formats_amount() {
        let statement = Statement::new(uuid::Uuid::nil(), OperationType::Withdraw, 12345, "rent");
        let json = serde_json::to_value(StatementResponse::from(statement)).unwrap();

        assert_eq!(json["amount"], "123.45");
        assert_eq!(json["type"], "withdraw");
    }
}
