//! PDF text extraction for report documents.
//!
//! Extraction is loader-layer: the corpus loader supplies bytes, this module
//! returns plain UTF-8 text in reading order (order-preserving, not
//! geometry-sorted). Extraction failure is per-document and the loader skips
//! the document, so nothing here panics.

use crate::fields::PAGE_BREAK;

/// Extraction error: the document could not be parsed as a PDF.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts the full text of a PDF, pages concatenated in order.
///
/// Form feeds some extractors emit between pages are normalized to the
/// `--- PAGE ---` boundary line the field grammar recognizes as a value
/// terminator; without them, end of text serves as the terminator.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(normalize_page_breaks(&text))
}

fn normalize_page_breaks(text: &str) -> String {
    if text.contains('\u{0c}') {
        text.replace('\u{0c}', &format!("\n{} ---\n", PAGE_BREAK))
    } else {
        text.to_string()
    }
}
