pub mod ai;
pub mod analytics;
pub mod auth;
pub mod transactions;
pub mod users;

use axum::Json;
use axum_extra::extract::{multipart::MultipartError, Multipart};
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::receipts::ReceiptFormat;

pub async fn health() -> Json<Value> {
    Json(json!({
        "message": "Personal Finance Tracker API is running",
        "timestamp": Utc::now().to_rfc3339(),
        "status": "OK",
    }))
}

/// A file field pulled out of a multipart body.
pub(crate) struct UploadedFile {
    pub format: ReceiptFormat,
    pub data: Vec<u8>,
}

/// Reads the file sent under `field_name`, checking its type before and its
/// size while the bytes arrive. Other fields are ignored.
pub(crate) async fn read_upload(
    mut multipart: Multipart,
    field_name: &str,
    max_bytes: usize,
) -> Result<UploadedFile, AppError> {
    let multipart_error = |err: MultipartError| AppError::from_multipart(err, max_bytes);
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(field_name) {
            continue;
        }

        let format = ReceiptFormat::detect(field.content_type(), field.file_name())?;
        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if data.len() + chunk.len() > max_bytes {
                return Err(AppError::PayloadTooLarge(max_bytes));
            }
            data.extend_from_slice(&chunk);
        }
        if data.is_empty() {
            break;
        }
        return Ok(UploadedFile { format, data });
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}
