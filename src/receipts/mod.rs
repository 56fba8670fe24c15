//! Receipt ingestion: validate an upload, park it in a temporary file, pull
//! text out of it and normalize that text into transaction fields.

pub mod category;
pub mod fields;
pub mod history;
pub mod text;

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use category::{classify_category, ExpenseCategory};
pub use fields::{analysis_from_text, normalize_date, parse_model_reply};
pub use history::{parse_statement, StatementLine};
pub use text::{extract_text, ExtractedText};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}. Please upload a PDF or image file (JPG, PNG, etc.)")]
    UnsupportedType(String),
    #[error("{0}")]
    NoText(String),
    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),
    #[error("Failed to extract text from image: {0}")]
    Ocr(String),
    #[error("Image text recognition is not available on this server. Upload a PDF instead.")]
    OcrUnavailable,
    #[error("upload i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Structured fields read off a receipt, used to pre-fill a new expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptAnalysis {
    pub extracted_text: String,
    pub merchant: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: NaiveDate,
    pub suggested_category: ExpenseCategory,
    pub confidence: f64,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
    Tiff,
    Pdf,
}

impl ReceiptFormat {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "webp" => Some(Self::Webp),
            "tif" | "tiff" => Some(Self::Tiff),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/bmp" | "image/x-ms-bmp" => Some(Self::Bmp),
            "image/webp" => Some(Self::Webp),
            "image/tiff" => Some(Self::Tiff),
            "application/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Accepts an upload only when its file extension is an allowed image or
    /// PDF type and its declared MIME type (if any) agrees on the family.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Result<Self, ExtractError> {
        let ext = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let format = Self::from_extension(&ext).ok_or_else(|| {
            ExtractError::UnsupportedType(if ext.is_empty() { "unknown".to_string() } else { format!(".{}", ext) })
        })?;

        let declared = content_type
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_lowercase())
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");
        if let Some(mime) = declared {
            match Self::from_mime(&mime) {
                Some(declared) if declared.is_pdf() == format.is_pdf() => {}
                _ => return Err(ExtractError::UnsupportedType(mime)),
            }
        }
        Ok(format)
    }

    pub fn is_pdf(self) -> bool {
        matches!(self, Self::Pdf)
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Webp => "image/webp",
            Self::Tiff => "image/tiff",
            Self::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Webp => "webp",
            Self::Tiff => "tiff",
            Self::Pdf => "pdf",
        }
    }
}

/// An upload parked on disk for the length of one request. The file is
/// removed when the guard drops, whatever happened in between; a failed
/// removal is logged and otherwise ignored.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    format: ReceiptFormat,
}

impl TempUpload {
    pub async fn write(dir: &Path, format: ReceiptFormat, data: &[u8]) -> Result<Self, ExtractError> {
        tokio::fs::create_dir_all(dir).await?;
        let file_name = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            format.extension()
        );
        let upload = Self { path: dir.join(file_name), format };
        tokio::fs::write(&upload.path, data).await?;
        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ReceiptFormat {
        self.format
    }

    pub async fn read(&self) -> Result<Vec<u8>, ExtractError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Temporary file cleaned up: {}", self.path.display()),
            Err(e) => log::error!("Failed to cleanup temporary file {}: {}", self.path.display(), e),
        }
    }
}

/// OCR/PDF extraction followed by the local field heuristics.
pub async fn analyze_locally(upload: &TempUpload, today: NaiveDate) -> Result<ReceiptAnalysis, ExtractError> {
    let extracted = extract_text(upload.format(), upload.path()).await?;
    Ok(analysis_from_text(&extracted.text, extracted.confidence, today))
}
