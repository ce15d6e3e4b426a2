//! Contact domain model.
//!
//! # Responsibility
//! - Define the canonical contact record used by the store and its adapters.
//! - Keep phone/email shape rules as pure functions next to the model.
//!
//! # Invariants
//! - Every contact is identified by a stable `ContactId`.
//! - Deletion is a hard delete; the undo snapshot is the only recovery path.

pub mod contact;
pub mod normalize;
