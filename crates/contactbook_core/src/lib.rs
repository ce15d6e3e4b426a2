//! Core domain logic for the contact book.
//! This crate owns every record invariant; front ends only parse input.

pub mod clock;
pub mod config;
pub mod dedupe;
pub mod error_sink;
pub mod export;
pub mod logging;
pub mod model;
pub mod repo;
pub mod safety;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BookConfig, ConfigError};
pub use dedupe::matcher::{
    DuplicateCandidate, DuplicateMatcher, MatchOptions, DEFAULT_DUPLICATE_THRESHOLD,
};
pub use dedupe::merge::merge;
pub use dedupe::similarity::{sequence_ratio, Similarity, SimilarityKind};
pub use export::vcard::default_vcard_file_name;
pub use error_sink::{ErrorSink, Fault, FileErrorSink, MemoryErrorSink};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::contact::{Contact, ContactId, ContactPatch, ContactValidationError};
pub use repo::error::{StoreError, StoreResult};
pub use repo::record_store::RecordStore;
pub use safety::backup::BackupScheduler;
pub use safety::snapshot::{Snapshot, SnapshotManager};
pub use service::contact_service::{ContactBook, ImportReport, ListOrder, MergeReport};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
