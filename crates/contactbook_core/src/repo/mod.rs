//! Contact storage layer.
//!
//! # Responsibility
//! - Own the CSV file format and the in-memory record collection.
//! - Keep file-format details out of service orchestration.
//!
//! # Invariants
//! - Write paths validate a record before it enters the collection.
//! - Read paths reject malformed persisted state instead of masking it.

pub mod csv_codec;
pub mod error;
pub mod query;
pub mod record_store;
