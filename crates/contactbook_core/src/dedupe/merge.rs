//! Field-precedence merge of two contacts.
//!
//! # Invariants
//! - The result keeps `primary.id`.
//! - Scalar fields prefer the primary unless it is empty.
//! - Tags are an ordered union: primary first, exact duplicates dropped.
//! - `favorite` is the OR of both flags.
//! - Only two nameless records fail; the store is never touched.

use crate::model::contact::Contact;
use crate::repo::error::{StoreError, StoreResult};
use std::collections::HashSet;

/// Merges `secondary` into a copy of `primary`.
///
/// # Errors
/// - `MergeConflict` when neither record has a name.
pub fn merge(primary: &Contact, secondary: &Contact) -> StoreResult<Contact> {
    let name = prefer(&primary.name, &secondary.name);
    if name.is_empty() {
        return Err(StoreError::MergeConflict {
            primary: primary.id,
            secondary: secondary.id,
        });
    }

    let email = primary
        .email
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| {
            secondary
                .email
                .as_deref()
                .filter(|value| !value.trim().is_empty())
        })
        .map(str::to_string);

    let mut seen = HashSet::new();
    let tags = primary
        .tags
        .iter()
        .chain(secondary.tags.iter())
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect();

    Ok(Contact {
        id: primary.id,
        name: name.to_string(),
        phone: prefer(&primary.phone, &secondary.phone).to_string(),
        email,
        tags,
        favorite: primary.favorite || secondary.favorite,
    })
}

fn prefer<'a>(primary: &'a str, secondary: &'a str) -> &'a str {
    if primary.trim().is_empty() {
        secondary.trim()
    } else {
        primary.trim()
    }
}
