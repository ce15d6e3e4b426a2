//! CSV-backed contact record store.
//!
//! # Responsibility
//! - Hold the in-memory contact collection and its backing file path.
//! - Provide validate-then-apply CRUD and query operations.
//! - Load and persist the whole collection in one step.
//!
//! # Invariants
//! - Ids are unique within the collection at all times.
//! - A rejected mutation leaves the collection unchanged.
//! - `load` is all-or-nothing; `persist` replaces the file via rename so a
//!   reader never observes a half-written file.

use crate::model::contact::{Contact, ContactId, ContactPatch};
use crate::repo::csv_codec::{decode_stored, read_rows, write_contacts};
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::query::ContactQuery;
use log::{error, info};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// In-memory contact collection bound to one CSV file.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    contacts: Vec<Contact>,
}

impl RecordStore {
    /// Creates an empty store bound to `path` without touching the disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contacts: Vec::new(),
        }
    }

    /// Creates a store and loads `path` into it.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|contact| contact.id == id)
    }

    /// Index of `id` in store order.
    pub fn position(&self, id: ContactId) -> Option<usize> {
        self.contacts.iter().position(|contact| contact.id == id)
    }

    /// First contact whose name equals `name`, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Option<&Contact> {
        let wanted = name.trim().to_lowercase();
        self.contacts
            .iter()
            .find(|contact| contact.name.to_lowercase() == wanted)
    }

    /// Replaces the in-memory collection with the backing file contents.
    ///
    /// A missing file loads as an empty store. A file in the legacy layout
    /// (no `id` column) is rewritten with its newly assigned ids straight away.
    ///
    /// # Errors
    /// - `StoreCorrupt` when any row is malformed; the current collection is
    ///   kept as it was.
    /// - `Io` when a legacy file cannot be rewritten in the current layout.
    pub fn load(&mut self) -> StoreResult<()> {
        let started_at = Instant::now();
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.contacts.clear();
                info!(
                    "event=store_load module=repo status=ok source=missing path={}",
                    self.path.display()
                );
                return Ok(());
            }
            Err(err) => return Err(StoreError::io("open", &self.path, err)),
        };

        let decoded = read_rows(BufReader::new(file), &self.path).and_then(|rows| {
            let legacy = rows.iter().any(|row| row.id.is_none());
            decode_stored(rows, &self.path).map(|contacts| (contacts, legacy))
        });
        match decoded {
            Ok((contacts, legacy)) => {
                self.contacts = contacts;
                if legacy {
                    self.persist()?;
                    info!(
                        "event=store_migrate module=repo status=ok records={} path={}",
                        self.contacts.len(),
                        self.path.display()
                    );
                }
                info!(
                    "event=store_load module=repo status=ok records={} duration_ms={}",
                    self.contacts.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_load module=repo status=error error_code=store_corrupt error={}",
                    err
                );
                Err(err)
            }
        }
    }

    /// Writes the collection to the backing file.
    pub fn persist(&self) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = write_atomic(&self.path, |writer| write_contacts(writer, &self.contacts));
        match &result {
            Ok(()) => info!(
                "event=store_persist module=repo status=ok records={} duration_ms={}",
                self.contacts.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_persist module=repo status=error path={} error={}",
                self.path.display(),
                err
            ),
        }
        result
    }

    /// Validates and appends a contact under a freshly assigned id.
    pub fn add(&mut self, mut contact: Contact) -> StoreResult<ContactId> {
        contact.normalize();
        contact.validate()?;
        contact.id = self.fresh_id();
        let id = contact.id;
        self.contacts.push(contact);
        Ok(id)
    }

    /// Applies `patch` to the contact with `id`.
    pub fn update(&mut self, id: ContactId, patch: &ContactPatch) -> StoreResult<&Contact> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        let next = patch.apply_to(&self.contacts[index]);
        next.validate()?;
        self.contacts[index] = next;
        Ok(&self.contacts[index])
    }

    /// Replaces the stored contact that has the same id as `contact`.
    pub fn replace(&mut self, mut contact: Contact) -> StoreResult<()> {
        let index = self
            .position(contact.id)
            .ok_or(StoreError::NotFound(contact.id))?;
        contact.normalize();
        contact.validate()?;
        self.contacts[index] = contact;
        Ok(())
    }

    pub fn delete(&mut self, id: ContactId) -> StoreResult<Contact> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        Ok(self.contacts.remove(index))
    }

    /// Swaps in a whole collection, e.g. from a snapshot or a backup.
    ///
    /// # Errors
    /// - `DuplicateId` when two records share an id; nothing is replaced.
    pub fn replace_all(&mut self, contacts: Vec<Contact>) -> StoreResult<()> {
        let mut seen = HashSet::with_capacity(contacts.len());
        if let Some(duplicate) = contacts.iter().find(|contact| !seen.insert(contact.id)) {
            return Err(StoreError::DuplicateId(duplicate.id));
        }
        self.contacts = contacts;
        Ok(())
    }

    /// Returns matching contacts in store order.
    ///
    /// # Errors
    /// - `Query` for a malformed `/…/` pattern.
    pub fn find(&self, query: &str) -> StoreResult<Vec<&Contact>> {
        let query = ContactQuery::parse(query)?;
        Ok(self
            .contacts
            .iter()
            .filter(|contact| query.matches(contact))
            .collect())
    }

    fn fresh_id(&self) -> ContactId {
        loop {
            let id = Uuid::new_v4();
            if self.get(id).is_none() {
                return id;
            }
        }
    }
}

/// Writes `path` through a sibling temp file and an atomic rename.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> StoreResult<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> StoreResult<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .map_err(|err| StoreError::io("create directory", &parent, err))?;

    let temp = NamedTempFile::new_in(&parent)
        .map_err(|err| StoreError::io("create temp file in", &parent, err))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer
            .flush()
            .map_err(|err| StoreError::io("write", temp.path(), err))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|err| StoreError::io("sync", temp.path(), err))?;
    temp.persist(path)
        .map_err(|err| StoreError::io("replace", path, err.error))?;
    Ok(())
}
