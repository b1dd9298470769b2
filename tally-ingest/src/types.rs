use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_CSV: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Csv,
}

impl DocumentKind {
    /// Classify an upload by MIME type and file name.
    ///
    /// `application/pdf` is a PDF; `text/csv` or a `.csv` suffix is a CSV.
    /// Without a MIME type a `.pdf` suffix also counts as PDF.
    pub fn classify(mime: Option<&str>, file_name: &str) -> Option<DocumentKind> {
        let mime = mime.map(|m| m.trim().to_ascii_lowercase());
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match (mime.as_deref(), ext.as_deref()) {
            (Some(MIME_PDF), _) => Some(DocumentKind::Pdf),
            (Some(MIME_CSV), _) | (_, Some("csv")) => Some(DocumentKind::Csv),
            (None, Some("pdf")) => Some(DocumentKind::Pdf),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Csv => "CSV",
        }
    }
}

/// An uploaded statement file, alive for one processing request
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub kind: DocumentKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(kind: DocumentKind, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}
