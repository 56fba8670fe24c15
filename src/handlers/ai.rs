use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::read_upload;
use crate::{
    ai::{self, TransactionAnalysis},
    error::AppError,
    middleware::CurrentUser,
    receipts::{self, ReceiptAnalysis, TempUpload},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub transaction: Value,
}

/// Reads a receipt with the hosted model, or with local OCR when no model is
/// configured.
pub async fn analyze_receipt(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> Result<Json<ReceiptAnalysis>, AppError> {
    let file = read_upload(multipart, "receipt", state.config.max_upload_bytes).await?;
    let upload = TempUpload::write(&state.config.upload_dir, file.format, &file.data).await?;
    let today = Utc::now().date_naive();

    let analysis = match &state.model {
        Some(model) => {
            log::info!("sending receipt to generative model for user {}", current.id());
            ai::analyze_receipt(model.as_ref(), upload.format(), upload.read().await?, today).await?
        }
        None => {
            log::debug!("no generative model configured, using local extraction");
            receipts::analyze_locally(&upload, today).await?
        }
    };
    Ok(Json(analysis))
}

pub async fn analyze_transaction(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<TransactionAnalysis>, AppError> {
    let model = state
        .model
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("AI analysis is not configured".to_string()))?;

    let analysis = ai::analyze_transaction(model.as_ref(), &body.transaction).await?;
    Ok(Json(analysis))
}
