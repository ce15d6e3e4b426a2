//! JSON export and import of the contact collection.
//!
//! The exported document is a pretty-printed array of contact objects.
//! Import also accepts id-less objects and comma-joined `tags` strings as
//! written by older exports.

use crate::model::contact::{Contact, ContactId};
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::record_store::write_atomic;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagField {
    List(Vec<String>),
    Joined(String),
}

impl Default for TagField {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl TagField {
    fn into_tags(self) -> Vec<String> {
        match self {
            Self::List(tags) => tags,
            Self::Joined(raw) => raw.split(',').map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImportedContact {
    #[serde(default)]
    id: Option<ContactId>,
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    tags: TagField,
    #[serde(default)]
    favorite: bool,
}

/// Writes `contacts` as a JSON array to `path`.
pub fn export_json(contacts: &[Contact], path: &Path) -> StoreResult<()> {
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, contacts)?;
        writer
            .write_all(b"\n")
            .map_err(|err| StoreError::io("write", path, err))
    })
}

/// Reads, normalizes and validates every contact in a JSON array.
///
/// # Errors
/// - `Json` for malformed documents.
/// - `Validation` for the first contact that fails validation.
pub fn read_json(path: &Path) -> StoreResult<Vec<Contact>> {
    let text = std::fs::read_to_string(path).map_err(|err| StoreError::io("read", path, err))?;
    parse_json(&text)
}

pub(crate) fn parse_json(text: &str) -> StoreResult<Vec<Contact>> {
    let imported: Vec<ImportedContact> = serde_json::from_str(text)?;
    imported
        .into_iter()
        .map(|entry| {
            let mut contact = Contact {
                id: entry.id.unwrap_or_else(Uuid::new_v4),
                name: entry.name,
                phone: entry.phone,
                email: entry.email,
                tags: entry.tags.into_tags(),
                favorite: entry.favorite,
            };
            contact.normalize();
            contact.validate()?;
            Ok(contact)
        })
        .collect()
}
