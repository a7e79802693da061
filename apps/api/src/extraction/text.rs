//! Text extraction: raw document bytes in, plain text (or a definite failure) out.
//!
//! PDF parsing is synchronous CPU work and can panic on hostile input, so it runs
//! inside `tokio::task::spawn_blocking` behind `catch_unwind`. Nothing a malformed
//! upload does escapes this module as anything other than an `ExtractError`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

/// Delimiter placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is empty")]
    Empty,

    #[error("failed to parse document: {0}")]
    Parse(String),

    #[error("document parser panicked")]
    Panicked,

    #[error("document contains no extractable text")]
    NoText,

    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Splits a document into per-page text. Implement this to swap the PDF backend.
pub trait PageParser: Send + Sync {
    fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// `pdf-extract` backed page parser.
pub struct PdfPageParser;

impl PageParser for PdfPageParser {
    fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| ExtractError::Parse(e.to_string()))
    }
}

#[derive(Clone)]
pub struct TextExtractor {
    parser: Arc<dyn PageParser>,
}

impl TextExtractor {
    pub fn pdf() -> Self {
        Self::with_parser(Arc::new(PdfPageParser))
    }

    pub fn with_parser(parser: Arc<dyn PageParser>) -> Self {
        Self { parser }
    }

    /// Extracts text on the blocking pool.
    pub async fn extract(&self, bytes: Bytes) -> Result<String, ExtractError> {
        let extractor = self.clone();
        tokio::task::spawn_blocking(move || extractor.extract_blocking(&bytes)).await?
    }

    pub fn extract_blocking(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::Empty);
        }

        let pages = catch_unwind(AssertUnwindSafe(|| self.parser.pages(bytes)))
            .map_err(|_| {
                warn!("Document parser panicked on a {}-byte input", bytes.len());
                ExtractError::Panicked
            })??;

        debug!("Parsed {} page(s)", pages.len());
        join_pages(&pages).ok_or(ExtractError::NoText)
    }
}

/// Joins non-blank pages with a paragraph break. `None` when nothing but
/// whitespace remains.
///
/// NUL characters are dropped; Postgres TEXT columns cannot store them.
pub fn join_pages(pages: &[String]) -> Option<String> {
    let pages: Vec<String> = pages.iter().map(|p| p.replace('\0', "")).collect();
    let text = pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR);

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Treats the upload bytes as a single page of UTF-8 text.
    pub struct PlainTextPages;

    impl PageParser for PlainTextPages {
        fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
            Ok(vec![String::from_utf8_lossy(bytes).into_owned()])
        }
    }

    pub fn plain_text_extractor() -> TextExtractor {
        TextExtractor::with_parser(Arc::new(PlainTextPages))
    }
}
