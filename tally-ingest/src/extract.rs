//! Text extraction from uploaded statements.
//!
//! PDFs are decoded page by page: each page becomes one whitespace-collapsed
//! line and pages are joined with `\n`. CSV bytes are returned verbatim.

use tally_core::ExtractionFailure;
use tracing::{debug, warn};

use crate::types::{DocumentKind, RawDocument};

/// PDF engine settings, handed to the extractor at construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfConfig {
    /// Stop after this many pages (all pages when `None`)
    pub max_pages: Option<usize>,
    /// Skip pages that fail to decode instead of failing the document
    pub skip_unreadable_pages: bool,
}

/// Per-page decode result: page text or the decoder's error message
pub type PageText = Result<String, String>;

/// Backend that turns PDF bytes into raw per-page text.
pub trait PageSource: Send + Sync {
    /// Decode up to `max_pages` pages in page order.
    ///
    /// The outer error means the bytes are not a readable PDF at all.
    fn page_texts(&self, bytes: &[u8], max_pages: Option<usize>) -> Result<Vec<PageText>, String>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Default backend built on `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfSource;

impl PageSource for LopdfSource {
    fn page_texts(&self, bytes: &[u8], max_pages: Option<usize>) -> Result<Vec<PageText>, String> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
        let pages = doc.get_pages();
        let limit = max_pages.unwrap_or(pages.len());

        Ok(pages
            .keys()
            .take(limit)
            .map(|&n| doc.extract_text(&[n]).map_err(|e| format!("page {n}: {e}")))
            .collect())
    }

    fn backend_name(&self) -> &str {
        "lopdf"
    }
}

/// Converts a [`RawDocument`] into flat text.
pub struct TextExtractor {
    config: PdfConfig,
    source: Box<dyn PageSource>,
}

impl TextExtractor {
    pub fn new(config: PdfConfig) -> Self {
        Self::with_source(config, Box::new(LopdfSource))
    }

    pub fn with_source(config: PdfConfig, source: Box<dyn PageSource>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &PdfConfig {
        &self.config
    }

    pub fn extract(&self, doc: &RawDocument) -> Result<String, ExtractionFailure> {
        debug!(file = %doc.file_name, kind = doc.kind.label(), size = doc.size(), "extracting text");
        match doc.kind {
            DocumentKind::Pdf => self.extract_pdf(&doc.bytes),
            DocumentKind::Csv => extract_csv(&doc.bytes),
        }
    }

    fn extract_pdf(&self, bytes: &[u8]) -> Result<String, ExtractionFailure> {
        let pages = self
            .source
            .page_texts(bytes, self.config.max_pages)
            .map_err(ExtractionFailure::DecodeError)?;

        let mut full = String::new();
        for page in pages {
            let raw = match page {
                Ok(text) => text,
                Err(e) if self.config.skip_unreadable_pages => {
                    warn!(backend = self.source.backend_name(), error = %e, "skipping unreadable page");
                    continue;
                }
                Err(e) => return Err(ExtractionFailure::DecodeError(e)),
            };

            let text = collapse_whitespace(&raw);
            if !text.is_empty() {
                full.push_str(&text);
                full.push('\n');
            }
        }

        let full = full.trim();
        if full.is_empty() {
            return Err(ExtractionFailure::EmptyDocument);
        }
        Ok(full.to_string())
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(PdfConfig::default())
    }
}

/// CSV payloads are kept as-is for the metadata heuristics and the model.
pub fn extract_csv(bytes: &[u8]) -> Result<String, ExtractionFailure> {
    String::from_utf8(bytes.to_vec()).map_err(|e| ExtractionFailure::ReadError(e.to_string()))
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
