use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    models::{normalize_email, LoginRequest, NewUser, RegisterRequest},
    utils::{hash_password, verify_password},
    AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let request = body.validate()?;

    let cost = state.config.bcrypt_cost;
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(AppError::internal)??;

    let user = state
        .store
        .create_user(NewUser {
            name: request.name,
            email: request.email,
            password_hash,
        })
        .await?;
    let token = state.keys.create_token(user.id)?;

    log::info!("registered user {}", user.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "token": token })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let email = normalize_email(&body.email);
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::BadRequest(INVALID_CREDENTIALS.to_string()))?;

    let password = body.password;
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(AppError::internal)??;
    if !valid {
        return Err(AppError::BadRequest(INVALID_CREDENTIALS.to_string()));
    }

    let token = state.keys.create_token(user.id)?;
    Ok(Json(json!({ "token": token })))
}
