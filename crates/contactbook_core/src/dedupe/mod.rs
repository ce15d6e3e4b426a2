//! Near-duplicate detection and merge.
//!
//! # Responsibility
//! - Propose merge candidates from pairwise name similarity.
//! - Resolve a pair into one record by a fixed field-precedence policy.
//!
//! # See also
//! - `service::contact_service` for applying merges to the store.

pub mod matcher;
pub mod merge;
pub mod similarity;
