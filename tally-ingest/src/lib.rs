//! tally-ingest: statement text extraction (PDF/CSV), metadata heuristics and line annotation.

pub mod annotate;
pub mod extract;
pub mod metadata;
pub mod rules;
pub mod types;

pub use annotate::{LineAnnotator, LineTag};
pub use extract::{LopdfSource, PageSource, PdfConfig, TextExtractor};
pub use metadata::MetadataExtractor;
pub use types::{DocumentKind, RawDocument};
