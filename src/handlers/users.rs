use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::CurrentUser,
    models::{UpdateProfile, UserResponse},
    AppState,
};

pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<UpdateProfile>,
) -> Result<Json<UserResponse>, AppError> {
    let update = body.validate()?;
    let user = state
        .store
        .update_user(current.id(), update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_user(current.id()).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    log::info!("deleted user {} and their transactions", current.id());
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
