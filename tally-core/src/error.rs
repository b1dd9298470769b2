//! Error taxonomy surfaced by the processing pipeline.

use thiserror::Error;

/// Why text could not be pulled out of an uploaded document
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("no text content found in document")]
    EmptyDocument,

    #[error("could not decode PDF: {0}")]
    DecodeError(String),

    #[error("could not read file: {0}")]
    ReadError(String),
}

/// Pipeline failure classes. Each maps to one user-facing message.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported file type for {file_name}: please upload a PDF or CSV file")]
    UnsupportedFileType { file_name: String },

    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),

    #[error("model call failed after {attempts} attempts: {message}")]
    RemoteCallExhausted { attempts: u32, message: String },

    #[error("model call was not attempted (retry policy allows zero attempts)")]
    NotAttempted,

    #[error("malformed model response: {0}")]
    MalformedModelResponse(String),

    #[error("transactions were categorized but could not be saved: {0}")]
    PersistenceFailure(String),
}

impl PipelineError {
    /// Message shown to the user once the in-progress status is cleared.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Extraction(e) => format!(
                "Error processing file: {e}. Please try extracting text manually and pasting it in."
            ),
            PipelineError::RemoteCallExhausted { .. }
            | PipelineError::NotAttempted
            | PipelineError::MalformedModelResponse(_) => {
                format!("Error processing transactions: {self}")
            }
            other => other.to_string(),
        }
    }
}
