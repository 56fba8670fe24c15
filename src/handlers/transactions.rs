use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::read_upload;
use crate::{
    error::AppError,
    middleware::CurrentUser,
    models::{CreateTransaction, Transaction, UpdateTransaction},
    receipts::{self, parse_statement, ReceiptAnalysis, TempUpload},
    AppState,
};

const NOT_FOUND: &str = "Transaction not found";

pub async fn list_transactions(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let transactions = state.store.list_transactions(current.id()).await?;
    Ok(Json(transactions))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<CreateTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let new = body.validate(Utc::now().date_naive())?;
    let transaction = state.store.create_transaction(current.id(), new).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTransaction>,
) -> Result<Json<Value>, AppError> {
    let update = body.validate()?;
    let transaction = state
        .store
        .update_transaction(current.id(), id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    Ok(Json(json!({
        "message": "Transaction updated successfully",
        "transaction": transaction,
    })))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_transaction(current.id(), id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    Ok(Json(json!({ "message": "Transaction deleted successfully" })))
}

/// OCR or PDF text extraction followed by the local field heuristics.
pub async fn upload_receipt(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> Result<Json<ReceiptAnalysis>, AppError> {
    let file = read_upload(multipart, "receipt", state.config.max_upload_bytes).await?;
    let upload = TempUpload::write(&state.config.upload_dir, file.format, &file.data).await?;

    log::info!("analyzing receipt upload for user {}", current.id());
    let analysis = receipts::analyze_locally(&upload, Utc::now().date_naive()).await?;
    Ok(Json(analysis))
}

/// Splits an uploaded statement PDF into candidate transactions.
pub async fn upload_history(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let file = read_upload(multipart, "history", state.config.max_upload_bytes).await?;
    if !file.format.is_pdf() {
        return Err(AppError::BadRequest("Please upload a PDF statement".to_string()));
    }
    let upload = TempUpload::write(&state.config.upload_dir, file.format, &file.data).await?;

    let extracted = receipts::extract_text(upload.format(), upload.path()).await?;
    let lines = parse_statement(&extracted.text);
    log::info!("extracted {} statement lines for user {}", lines.len(), current.id());

    Ok(Json(json!({ "extractedTransactions": lines })))
}
