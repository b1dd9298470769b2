//! tally-finance: model client with retry, transaction categorization, insights and the processing pipeline

pub mod categorize;
pub mod client;
pub mod insights;
pub mod pipeline;
pub mod retry;
pub mod schema;

pub use categorize::{categorize, parse_transactions};
pub use client::{GeminiTransport, ModelClient, ModelSettings, ModelTransport};
pub use pipeline::Pipeline;
pub use retry::{RetryOutcome, RetryPolicy};
pub use schema::{GenerateRequest, GenerateResponse};
