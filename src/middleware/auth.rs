use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::{error::AppError, models::User, utils::bearer_token, AppState};

const NO_TOKEN: &str = "No token, authorization denied";
const BAD_TOKEN: &str = "Token is not valid";

/// The authenticated caller, loaded from the store on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized(NO_TOKEN.to_string()))?;

        let claims = state.keys.verify_token(token).map_err(|e| {
            log::debug!("rejected token: {}", e);
            AppError::Unauthorized(BAD_TOKEN.to_string())
        })?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized(BAD_TOKEN.to_string()))?;

        // A token outliving its account is as good as a forged one.
        let user = state
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(BAD_TOKEN.to_string()))?;

        Ok(CurrentUser(user))
    }
}
