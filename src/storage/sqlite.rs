use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    normalize_email, Cents, OperationType, Statement, StatementId, User, UserId,
};

use super::{
    StatementsRepository, StorageError, StorageResult, UsersRepository, MIGRATION_001_INITIAL,
};

/// SQLite-backed store for users and statements.
/// Implements both repository traits over a single connection pool.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at timestamp")?,
        })
    }

    fn row_to_statement(row: &sqlx::sqlite::SqliteRow) -> Result<Statement> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let kind_str: String = row.get("type");
        let created_at_str: String = row.get("created_at");

        Ok(Statement {
            id: Uuid::parse_str(&id_str).context("Invalid statement ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid statement user ID")?,
            kind: OperationType::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid operation type: {}", kind_str))?,
            amount_cents: row.get("amount_cents"),
            description: row.get("description"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

#[async_trait]
impl UsersRepository for SqliteRepository {
    async fn create(&self, name: &str, email: &str, password_hash: &str) -> StorageResult<User> {
        if self.find_by_email(email).await?.is_some() {
            return Err(StorageError::DuplicateEmail(normalize_email(email)));
        }

        let user = User::new(name, email, password_hash);

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            // Lost a race against another insert of the same email
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StorageError::DuplicateEmail(user.email))
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to save user").into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: UserId) -> StorageResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: UserId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> StorageResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, name, email, password_hash, created_at, updated_at FROM users ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        Ok(rows
            .iter()
            .map(Self::row_to_user)
            .collect::<Result<Vec<_>>>()?)
    }
}

#[async_trait]
impl StatementsRepository for SqliteRepository {
    async fn create(
        &self,
        user_id: UserId,
        kind: OperationType,
        amount_cents: Cents,
        description: &str,
    ) -> StorageResult<Statement> {
        let statement = Statement::new(user_id, kind, amount_cents, description);

        sqlx::query(
            r#"
            INSERT INTO statements (id, user_id, type, amount_cents, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(statement.id.to_string())
        .bind(statement.user_id.to_string())
        .bind(statement.kind.as_str())
        .bind(statement.amount_cents)
        .bind(&statement.description)
        .bind(statement.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save statement")?;

        Ok(statement)
    }

    async fn find_by_id(&self, id: StatementId) -> StorageResult<Option<Statement>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, type, amount_cents, description, created_at
            FROM statements
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch statement")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_statement(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: UserId) -> StorageResult<Vec<Statement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, type, amount_cents, description, created_at
            FROM statements
            WHERE user_id = ?
            ORDER BY sequence
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list statements for user")?;

        Ok(rows
            .iter()
            .map(Self::row_to_statement)
            .collect::<Result<Vec<_>>>()?)
    }
}
