//! Write safety nets: single-level undo and dated backups.
//!
//! # Responsibility
//! - Bound the window between an in-memory mutation and its persist step.
//! - Keep recovery state outside the primary store file.

pub mod backup;
pub mod snapshot;
