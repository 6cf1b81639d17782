//! Page-by-page PDF text extraction

use crate::error::FileReadError;
use lopdf::Document;
use std::path::Path;

/// Text of one PDF page
#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    /// 1-based page number
    pub number: u32,
    pub text: String,
}

/// Extract text from every page of a PDF, in page order
///
/// Hard-wrapped lines are joined into paragraphs. Pages without extractable
/// text (scans, images) are returned with empty text and dropped later by
/// the chunker.
pub fn extract_pdf_pages(path: &Path) -> Result<Vec<PdfPage>, FileReadError> {
    let pdf_error = |reason: String| FileReadError::Pdf {
        path: path.to_path_buf(),
        reason,
    };

    let doc = Document::load(path).map_err(|e| {
        if e.to_string().to_lowercase().contains("encrypted") {
            pdf_error("document is encrypted".to_string())
        } else {
            pdf_error(e.to_string())
        }
    })?;

    // BTreeMap keys, already ascending
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(pdf_error("document has no pages".to_string()));
    }

    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in page_numbers {
        let raw = doc
            .extract_text(&[number])
            .map_err(|e| pdf_error(format!("page {}: {}", number, e)))?;
        let text = join_paragraphs(&raw);

        tracing::debug!(
            page = number,
            text_length = text.len(),
            "Extracted text from PDF page"
        );
        pages.push(PdfPage { number, text });
    }

    Ok(pages)
}

/// Collapse hard-wrapped lines into paragraphs separated by blank lines
fn join_paragraphs(text: &str) -> String {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}
