// Application layer - use cases and wiring.
// Every client (HTTP API, CLI) goes through `Services`.

mod auth;
pub mod error;
mod ledger;
pub mod password;
mod profile;
pub mod token;

use std::sync::Arc;

pub use auth::*;
pub use error::*;
pub use ledger::*;
pub use profile::*;

use crate::config::AuthConfig;
use crate::storage::{
    InMemoryStatementsRepository, InMemoryUsersRepository, SqliteRepository,
    StatementsRepository, UsersRepository,
};

/// The full set of application services over one pair of repositories.
pub struct Services {
    pub auth: AuthService,
    pub ledger: LedgerService,
    pub profile: ProfileService,
}

impl Services {
    pub fn new(
        users: Arc<dyn UsersRepository>,
        statements: Arc<dyn StatementsRepository>,
        auth_config: &AuthConfig,
    ) -> Self {
        Self {
            auth: AuthService::new(users.clone(), auth_config),
            ledger: LedgerService::new(users.clone(), statements),
            profile: ProfileService::new(users),
        }
    }

    /// Services over a fresh in-memory store. Nothing survives the process.
    pub fn in_memory(auth_config: &AuthConfig) -> Self {
        Self::new(
            Arc::new(InMemoryUsersRepository::new()),
            Arc::new(InMemoryStatementsRepository::new()),
            auth_config,
        )
    }

    /// Create (if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str, auth_config: &AuthConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Arc::new(SqliteRepository::init(&db_url).await?);
        Ok(Self::new(repo.clone(), repo, auth_config))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, auth_config: &AuthConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Arc::new(SqliteRepository::connect(&db_url).await?);
        Ok(Self::new(repo.clone(), repo, auth_config))
    }
}
