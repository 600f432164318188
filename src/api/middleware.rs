use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::application::{AppError, Services};
use crate::domain::UserId;

/// Identity attached to a request once its bearer token checks out.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

pub async fn auth_middleware(
    State(services): State<Arc<Services>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(req.headers())?;
    let user_id = services.auth.validate(token)?;

    req.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AppError::InvalidToken)?;

    let header = header.to_str().map_err(|_| AppError::InvalidToken)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidToken)?
        .trim();

    if token.is_empty() {
        return Err(AppError::InvalidToken);
    }

    Ok(token)
}
