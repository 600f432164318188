// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use finapi::application::Services;
use finapi::config::AuthConfig;
use finapi::domain::{Cents, OperationType, Statement, User};
use tempfile::TempDir;

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn auth_config() -> AuthConfig {
    AuthConfig::new(JWT_SECRET, chrono::Duration::days(1))
}

/// Helper to create services over a temporary SQLite database
pub async fn test_services() -> Result<(Services, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let services = Services::init(db_path.to_str().unwrap(), &auth_config()).await?;
    Ok((services, temp_dir))
}

/// Same as `test_services`, shared for use across tasks
pub async fn shared_services() -> Result<(Arc<Services>, TempDir)> {
    let (services, temp) = test_services().await?;
    Ok((Arc::new(services), temp))
}

/// Test fixture: standard users
pub struct StandardUsers;

impl StandardUsers {
    pub const PASSWORD: &'static str = "123456";

    pub async fn marcelo(services: &Services) -> Result<User> {
        Ok(services
            .auth
            .register("Marcelo Petrucio", "marcelo@decoleira.com.br", Self::PASSWORD)
            .await?)
    }

    pub async fn admin(services: &Services) -> Result<User> {
        Ok(services
            .auth
            .register("admin", "admin@finapi.com.br", "admin")
            .await?)
    }
}

pub async fn deposit(services: &Services, user: &User, amount: Cents) -> Result<Statement> {
    Ok(services
        .ledger
        .create_statement(user.id, OperationType::Deposit, amount, "deposit")
        .await?)
}
