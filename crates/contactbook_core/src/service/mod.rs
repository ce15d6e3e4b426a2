//! Contact book use-case services.
//!
//! # Responsibility
//! - Compose the store, undo slot, backups and duplicate matcher into
//!   use-case level APIs.
//! - Keep the CLI decoupled from file-format and recovery details.

pub mod contact_service;
