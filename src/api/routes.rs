use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::application::{AppError, Services};
use crate::domain::OperationType;

use super::dto::{
    AuthenticateRequest, BalanceResponse, RegisterRequest, SessionResponse, StatementRequest,
    StatementResponse, UserResponse,
};
use super::middleware::AuthenticatedUser;

type ApiResult<T> = Result<T, AppError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    State(services): State<Arc<Services>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;
    let user = services
        .auth
        .register(&request.name, &request.email, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn authenticate(
    State(services): State<Arc<Services>>,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;
    let session = services
        .auth
        .authenticate(&request.email, &request.password)
        .await?;
    Ok(Json(SessionResponse::from(session)))
}

pub async fn show_profile(
    State(services): State<Arc<Services>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> ApiResult<impl IntoResponse> {
    let user = services.profile.show(user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn get_balance(
    State(services): State<Arc<Services>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> ApiResult<impl IntoResponse> {
    let view = services.ledger.get_balance(user_id).await?;
    Ok(Json(BalanceResponse::from(view)))
}

pub async fn create_deposit(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<StatementRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    create_statement(services, user, OperationType::Deposit, payload).await
}

pub async fn create_withdraw(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<StatementRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    create_statement(services, user, OperationType::Withdraw, payload).await
}

async fn create_statement(
    services: Arc<Services>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    kind: OperationType,
    payload: Result<Json<StatementRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StatementResponse>)> {
    let request = body(payload)?;
    let statement = services
        .ledger
        .create_statement(user_id, kind, request.amount, &request.description)
        .await?;
    Ok((StatusCode::CREATED, Json(StatementResponse::from(statement))))
}

pub async fn get_statement(
    State(services): State<Arc<Services>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(statement_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    // An id that is not even a UUID cannot name an existing statement
    let statement_id = Uuid::parse_str(&statement_id)
        .map_err(|_| AppError::StatementNotFound(statement_id.clone()))?;

    let statement = services
        .ledger
        .get_statement_operation(user_id, statement_id)
        .await?;
    Ok(Json(StatementResponse::from(statement)))
}
