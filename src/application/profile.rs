use std::sync::Arc;

use crate::domain::{User, UserId};
use crate::storage::UsersRepository;

use super::AppError;

/// Read access to user profiles, plus the administrative operations the CLI needs.
pub struct ProfileService {
    users: Arc<dyn UsersRepository>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UsersRepository>) -> Self {
        Self { users }
    }

    pub async fn show(&self, user_id: UserId) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    pub async fn show_by_email(&self, email: &str) -> Result<User, AppError> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::UserNotFound(email.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.list().await?)
    }

    /// Administrative removal. Existing tokens for the user keep validating,
    /// but every operation on the account reports `UserNotFound` afterwards.
    pub async fn delete(&self, email: &str) -> Result<User, AppError> {
        let user = self.show_by_email(email).await?;
        self.users.delete(user.id).await?;
        tracing::warn!(user_id = %user.id, "user deleted");
        Ok(user)
    }
}
