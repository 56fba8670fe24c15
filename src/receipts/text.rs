use std::path::Path;

use super::{ExtractError, ReceiptFormat};

/// Raw text pulled out of an upload plus how sure the extractor is of it.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub confidence: f64,
}

const NO_PDF_TEXT: &str =
    "Failed to extract text from PDF. Please ensure the PDF contains readable text.";
const NO_IMAGE_TEXT: &str =
    "Failed to extract text from image. Please ensure the image is clear and contains readable text.";

pub async fn extract_text(format: ReceiptFormat, path: &Path) -> Result<ExtractedText, ExtractError> {
    let extracted = if format.is_pdf() {
        let bytes = tokio::fs::read(path).await?;
        tokio::task::spawn_blocking(move || pdf_text(&bytes)).await??
    } else {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || ocr::recognize(&path)).await??
    };

    if extracted.text.trim().is_empty() {
        let message = if format.is_pdf() { NO_PDF_TEXT } else { NO_IMAGE_TEXT };
        return Err(ExtractError::NoText(message.to_string()));
    }
    Ok(extracted)
}

/// Reads the text layer of every page. Scanned PDFs without one come back
/// empty.
pub fn pdf_text(bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    let text = document
        .extract_text(&pages)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    Ok(ExtractedText { text, confidence: 1.0 })
}

// Image OCR links against Tesseract/Leptonica, so it sits behind the `ocr`
// feature; without it image uploads report that OCR is unavailable.
#[cfg(feature = "ocr")]
mod ocr {
    use super::{ExtractError, ExtractedText, Path};
    use leptess::LepTess;

    pub fn recognize(path: &Path) -> Result<ExtractedText, ExtractError> {
        let mut engine = LepTess::new(None, "eng").map_err(|e| ExtractError::Ocr(e.to_string()))?;
        engine
            .set_image(path)
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;
        let text = engine
            .get_utf8_text()
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;
        let confidence = f64::from(engine.mean_text_conf().clamp(0, 100)) / 100.0;

        log::info!("OCR finished with mean confidence {}", confidence);
        Ok(ExtractedText { text, confidence })
    }
}

#[cfg(not(feature = "ocr"))]
mod ocr {
    use super::{ExtractError, ExtractedText, Path};

    pub fn recognize(_path: &Path) -> Result<ExtractedText, ExtractError> {
        Err(ExtractError::OcrUnavailable)
    }
}
