// Address Reconciliation Engine - Core Library
// Reconciles customer address change requests against the address of record

pub mod engine;
pub mod extract;
pub mod index;
pub mod io;
pub mod normalize;
pub mod records;
pub mod schema;
pub mod similarity;
pub mod upload;

// Re-export commonly used types
pub use engine::{
    Decision, MatchedPair, MatchedRow, ReconciliationEngine, ReconciliationReport, RunSummary,
    SubmissionOutcome, UnmatchedReason, UnmatchedRow,
};
pub use extract::{parse_pickup_count, AddressExtractor, SubmissionDefect};
pub use index::{normalize_account_id, RecordIndex};
pub use io::{load_submissions, load_system_rows, write_outputs};
pub use normalize::normalize;
pub use records::{
    AddressRecord, AddressRole, NormalizedAddress, SubmissionRow, SubmissionTable, SystemRecord,
    SystemRow,
};
pub use schema::{
    validate_system_headers, BoundSchema, RoleColumns, SchemaError, SubmissionSchema,
};
pub use similarity::{MatchConfig, SimilarityScorer};
pub use upload::{UploadProjector, UploadRow, INVOICE_OPTION_CODES};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
