use std::sync::Arc;

use crate::config::AuthConfig;
use crate::domain::{normalize_email, User, UserId};
use crate::storage::UsersRepository;

use super::password::{hash_password, verify_password};
use super::token::TokenSigner;
use super::AppError;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Registration, credential checks and session tokens.
pub struct AuthService {
    users: Arc<dyn UsersRepository>,
    tokens: TokenSigner,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepository>, config: &AuthConfig) -> Self {
        Self {
            users,
            tokens: TokenSigner::new(config.jwt_secret.as_bytes(), config.token_ttl),
        }
    }

    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }

    /// Register a new user. The password is stored only as an Argon2 hash.
    #[tracing::instrument(skip(self, name, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let name = name.trim();
        let email = normalize_email(email);

        if name.is_empty() {
            return Err(AppError::InvalidInput("name must not be empty".to_string()));
        }
        if !is_plausible_email(&email) {
            return Err(AppError::InvalidInput(format!("invalid email: {}", email)));
        }
        if password.is_empty() {
            return Err(AppError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }

        // Cheap check first so a duplicate does not pay for hashing
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail(email));
        }

        let password_hash = hash_blocking(password.to_string()).await?;
        let user = self.users.create(name, &email, &password_hash).await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verify credentials and issue a session token.
    ///
    /// Unknown email and wrong password fail identically, and both paths run
    /// one Argon2 computation.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let user = self.users.find_by_email(email).await?;

        let verified = match &user {
            Some(user) => {
                verify_blocking(password.to_string(), user.password_hash.clone()).await?
            }
            None => {
                hash_blocking(password.to_string()).await?;
                false
            }
        };

        let user = match user {
            Some(user) if verified => user,
            _ => {
                tracing::info!("authentication failed");
                return Err(AppError::InvalidCredentials);
            }
        };

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = %user.id, "session issued");
        Ok(Session { token, user })
    }

    /// Resolve a session token to its user id.
    /// Does not check that the user still exists.
    pub fn validate(&self, token: &str) -> Result<UserId, AppError> {
        self.tokens.verify(token)
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

async fn hash_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Crypto(format!("hashing task failed: {}", e)))?
}

async fn verify_blocking(password: String, stored_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Crypto(format!("verification task failed: {}", e)))
}
