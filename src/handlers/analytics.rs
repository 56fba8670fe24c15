use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    analytics::{self, CategoryShare, DashboardSummary, Insights, MonthlyTotal, ANALYTICS_MONTHS},
    error::AppError,
    middleware::CurrentUser,
    AppState,
};

const MAX_MONTHS: usize = 24;

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub months: Option<usize>,
}

pub async fn summary(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<DashboardSummary>, AppError> {
    let transactions = state.store.list_transactions(current.id()).await?;
    Ok(Json(analytics::dashboard_summary(&transactions, Utc::now().date_naive())))
}

pub async fn monthly(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<MonthlyQuery>,
) -> Result<Json<Vec<MonthlyTotal>>, AppError> {
    let months = query.months.unwrap_or(ANALYTICS_MONTHS);
    if !(1..=MAX_MONTHS).contains(&months) {
        return Err(AppError::BadRequest(format!(
            "months must be between 1 and {}",
            MAX_MONTHS
        )));
    }

    let transactions = state.store.list_transactions(current.id()).await?;
    Ok(Json(analytics::recent_months(&transactions, months)))
}

pub async fn categories(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<CategoryShare>>, AppError> {
    let transactions = state.store.list_transactions(current.id()).await?;
    Ok(Json(analytics::category_breakdown(&transactions)))
}

pub async fn insights(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Insights>, AppError> {
    let transactions = state.store.list_transactions(current.id()).await?;
    Ok(Json(analytics::insights(&transactions)))
}
