//! Document loading
//!
//! Produces an ordered sequence of pages from a file path. PDF pages map one
//! to one; plain text and Markdown collapse to a single page.

use crate::error::{DoclensError, Result};
use std::path::Path;

/// A single page of a loaded document, immutable once created
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPage {
    pub content: String,
    /// 1-based position in the document
    pub page_number: usize,
    /// Original filename
    pub source: String,
}

/// Load a document, dispatching on the file extension
///
/// Missing files and unrecognized extensions are distinct, non-retryable
/// error kinds.
pub fn load_document(path: &Path) -> Result<Vec<DocumentPage>> {
    if !path.exists() {
        return Err(DoclensError::DocumentNotFound {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "pdf" => load_pdf(path),
        "txt" | "md" => load_plain_text(path),
        _ => Err(DoclensError::UnsupportedFileType { extension }),
    }
}

fn load_pdf(path: &Path) -> Result<Vec<DocumentPage>> {
    let doc = lopdf::Document::load(path).map_err(|e| DoclensError::Pdf {
        path: path.to_path_buf(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let source = file_name(path);
    let page_ids: Vec<u32> = doc.get_pages().keys().copied().collect();

    tracing::debug!("Extracting text from {} PDF pages", page_ids.len());

    let mut pages = Vec::new();
    for (i, page_id) in page_ids.iter().enumerate() {
        let text = match doc.extract_text(&[*page_id]) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to extract text from page {}, skipping: {}", i + 1, e);
                continue;
            }
        };

        // Skip empty pages but keep the document's page numbering
        if text.trim().is_empty() {
            continue;
        }

        pages.push(DocumentPage {
            content: text,
            page_number: i + 1,
            source: source.clone(),
        });
    }

    if pages.is_empty() {
        return Err(DoclensError::Pdf {
            path: path.to_path_buf(),
            message: "No text content extracted from PDF".to_string(),
        });
    }

    Ok(pages)
}

/// Plain text and Markdown have no native pagination; treat as one page
fn load_plain_text(path: &Path) -> Result<Vec<DocumentPage>> {
    let content = std::fs::read_to_string(path).map_err(|e| DoclensError::Io {
        source: e,
        context: format!("Failed to read document: {:?}", path),
    })?;

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![DocumentPage {
        content,
        page_number: 1,
        source: file_name(path),
    }])
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
