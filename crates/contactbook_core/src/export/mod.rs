//! Format adapters at the store boundary.
//!
//! # Responsibility
//! - Produce JSON and vCard documents from contact records.
//! - Read JSON documents back into validated records.

pub mod json;
pub mod vcard;
