//! tally-core: statement data model, date normalization and the statement assembler

pub mod error;
pub mod finance;
pub mod statement;
pub mod store;
pub mod time;

pub use error::{ExtractionFailure, PipelineError};
pub use finance::{amount_string, two_decimals, Category, Direction, StatementSummary, Transaction};
pub use statement::{
    assemble, statement_id, ProcessedStatement, StatementListing, StatementMetadata,
    CSV_ACCOUNT_HOLDER, MANUAL_ENTRY_FILE_NAME, UNKNOWN_ACCOUNT_HOLDER,
};
pub use store::{MemoryStore, StatementStore};
pub use time::{iso_date, normalize_date, normalize_date_or, today_utc};
