//! Upload-to-storage orchestration: extract, categorize, derive metadata, assemble, persist.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tally_core::{
    assemble, ExtractionFailure, PipelineError, ProcessedStatement, StatementStore,
    MANUAL_ENTRY_FILE_NAME,
};
use tally_ingest::{DocumentKind, LineAnnotator, MetadataExtractor, PdfConfig, RawDocument, TextExtractor};
use tracing::{error, info};

use crate::categorize::categorize;
use crate::client::ModelClient;

pub struct Pipeline {
    extractor: Arc<TextExtractor>,
    metadata: MetadataExtractor,
    annotator: LineAnnotator,
    model: ModelClient,
    store: Arc<dyn StatementStore>,
}

impl Pipeline {
    pub fn new(pdf: PdfConfig, model: ModelClient, store: Arc<dyn StatementStore>) -> Result<Self> {
        Self::with_extractor(TextExtractor::new(pdf), model, store)
    }

    pub fn with_extractor(
        extractor: TextExtractor,
        model: ModelClient,
        store: Arc<dyn StatementStore>,
    ) -> Result<Self> {
        Ok(Self {
            extractor: Arc::new(extractor),
            metadata: MetadataExtractor::new()?,
            annotator: LineAnnotator::new()?,
            model,
            store,
        })
    }

    pub fn store(&self) -> &Arc<dyn StatementStore> {
        &self.store
    }

    pub fn model(&self) -> &ModelClient {
        &self.model
    }

    /// Classify an upload. Unsupported types are rejected before any extraction.
    pub fn accept(
        mime: Option<&str>,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<RawDocument, PipelineError> {
        match DocumentKind::classify(mime, file_name) {
            Some(kind) => Ok(RawDocument::new(kind, file_name, bytes)),
            None => {
                let e = PipelineError::UnsupportedFileType {
                    file_name: file_name.to_string(),
                };
                error!(file = file_name, error = %e, "rejected upload");
                Err(e)
            }
        }
    }

    /// Process an uploaded statement end to end and persist the result.
    pub async fn process(&self, doc: &RawDocument) -> Result<ProcessedStatement, PipelineError> {
        info!(file = %doc.file_name, kind = doc.kind.label(), bytes = doc.size(), "processing statement");
        let text = self
            .extract(doc)
            .await
            .map_err(PipelineError::from)
            .inspect_err(|e| error!(file = %doc.file_name, error = %e, "text extraction failed"))?;

        self.finish(&text, doc.kind, &doc.file_name).await
    }

    /// PDF parsing is CPU-bound and runs on the blocking pool. CSV decoding stays inline.
    async fn extract(&self, doc: &RawDocument) -> Result<String, ExtractionFailure> {
        if doc.kind == DocumentKind::Csv {
            return self.extractor.extract(doc);
        }
        let extractor = Arc::clone(&self.extractor);
        let doc = doc.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&doc))
            .await
            .map_err(|e| ExtractionFailure::ReadError(format!("extraction task failed: {e}")))?
    }

    /// Process text pasted in by hand. It is treated as PDF text.
    pub async fn process_text(&self, text: &str) -> Result<ProcessedStatement, PipelineError> {
        if text.trim().is_empty() {
            let e = PipelineError::from(ExtractionFailure::EmptyDocument);
            error!(error = %e, "manual entry was empty");
            return Err(e);
        }
        self.finish(text, DocumentKind::Pdf, MANUAL_ENTRY_FILE_NAME).await
    }

    async fn finish(
        &self,
        raw: &str,
        kind: DocumentKind,
        file_name: &str,
    ) -> Result<ProcessedStatement, PipelineError> {
        let prompt_text = match kind {
            DocumentKind::Pdf => self.annotator.annotate(raw),
            DocumentKind::Csv => raw.to_string(),
        };

        let transactions = categorize(&self.model, &prompt_text, kind)
            .await
            .inspect_err(|e| error!(file = file_name, error = %e, "categorization failed"))?;

        let metadata = self.metadata.extract(raw);
        let statement = assemble(raw, metadata, transactions, file_name, Utc::now());

        self.store
            .save(&statement)
            .map_err(|e| PipelineError::PersistenceFailure(format!("{e:#}")))
            .inspect_err(|e| error!(id = %statement.id, error = %e, "saving statement failed"))?;

        info!(
            id = %statement.id,
            transactions = statement.transactions.len(),
            "statement stored"
        );
        Ok(statement)
    }
}
