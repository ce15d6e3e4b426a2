//! Contact book use-case service.
//!
//! # Responsibility
//! - Own the record store and its safety nets as one explicit object.
//! - Run every write as: validate and apply in memory, capture the
//!   pre-mutation snapshot, persist, then take the daily backup.
//! - Provide search, listing, duplicate merge, import/export and restore.
//!
//! # Invariants
//! - A rejected write changes neither memory, disk nor the undo slot. A
//!   write whose persist fails is rolled back in memory and in the undo slot.
//! - Backup and side-file failures are recorded in the error sink and never
//!   fail the write.
//! - Undo restores the collection captured before the most recent write.

use crate::clock::Clock;
use crate::config::BookConfig;
use crate::dedupe::matcher::{DuplicateCandidate, DuplicateMatcher};
use crate::dedupe::merge::merge;
use crate::error_sink::{ErrorSink, Fault};
use crate::export::json::{export_json, read_json};
use crate::export::vcard::export_vcards;
use crate::model::contact::{Contact, ContactId, ContactPatch};
use crate::repo::csv_codec::{decode_import, decode_stored, read_rows, RowRejection};
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::record_store::RecordStore;
use crate::safety::backup::BackupScheduler;
use crate::safety::snapshot::{Snapshot, SnapshotManager};
use log::{error, info, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Ordering for [`ContactBook::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Case-insensitive name order.
    #[default]
    Name,
    /// Favorites first, then by name.
    FavoritesFirst,
}

/// Outcome of an automatic merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// `(primary, absorbed secondary)` pairs in merge order.
    pub merged: Vec<(ContactId, ContactId)>,
    /// Pairs the decision callback turned down.
    pub declined: usize,
    /// Pairs touching a record already absorbed earlier in the pass.
    pub skipped: usize,
    /// Pairs that could not be merged; each one is in the error sink.
    pub conflicts: usize,
}

/// Outcome of a CSV import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub rejected: Vec<RowRejection>,
}

/// Explicitly owned contact book: store, undo slot, backups and fault sink.
pub struct ContactBook {
    store: RecordStore,
    snapshots: SnapshotManager,
    backups: BackupScheduler,
    matcher: DuplicateMatcher,
    sink: Arc<dyn ErrorSink>,
}

impl ContactBook {
    /// Opens the book described by `config`, loading the store file and any
    /// snapshot left by a previous run.
    ///
    /// # Errors
    /// - `StoreCorrupt` when the store file cannot be parsed.
    /// - `InvalidThreshold` for an out-of-range duplicate threshold.
    pub fn open(
        config: &BookConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ErrorSink>,
    ) -> StoreResult<Self> {
        let store = RecordStore::open(config.store_path())?;
        Self::assemble(store, config, clock, sink)
    }

    /// Opens the book even when the store file is corrupt, so that backups
    /// can still be listed and restored.
    ///
    /// A corrupt store opens empty; the returned error is also recorded in the
    /// error sink. The file on disk is left as it is until the next write.
    ///
    /// # Errors
    /// - Any open failure other than `StoreCorrupt`.
    pub fn open_recovering(
        config: &BookConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ErrorSink>,
    ) -> StoreResult<(Self, Option<StoreError>)> {
        match RecordStore::open(config.store_path()) {
            Ok(store) => Ok((Self::assemble(store, config, clock, sink)?, None)),
            Err(err @ StoreError::StoreCorrupt { .. }) => {
                warn!(
                    "event=store_open module=service status=recovering path={}",
                    config.store_path().display()
                );
                sink.record(&Fault::new("store_open", &err));
                let store = RecordStore::new(config.store_path());
                Ok((Self::assemble(store, config, clock, sink)?, Some(err)))
            }
            Err(err) => Err(err),
        }
    }

    fn assemble(
        store: RecordStore,
        config: &BookConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ErrorSink>,
    ) -> StoreResult<Self> {
        let matcher = DuplicateMatcher::from_kind(config.similarity, config.match_options())?;
        let snapshots = SnapshotManager::mirrored(config.snapshot_path(), Arc::clone(&sink));
        let backups = BackupScheduler::new(config.backup_path(), clock, Arc::clone(&sink));
        Ok(Self::from_parts(store, snapshots, backups, matcher, sink))
    }

    pub fn from_parts(
        store: RecordStore,
        snapshots: SnapshotManager,
        backups: BackupScheduler,
        matcher: DuplicateMatcher,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            store,
            snapshots,
            backups,
            matcher,
            sink,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn can_undo(&self) -> bool {
        self.snapshots.has_snapshot()
    }

    pub fn get(&self, id: ContactId) -> StoreResult<&Contact> {
        self.store.get(id).ok_or(StoreError::NotFound(id))
    }

    /// Resolves a UUID or an exact (case-insensitive) name to an id.
    pub fn resolve(&self, target: &str) -> StoreResult<ContactId> {
        let target = target.trim();
        if let Ok(id) = Uuid::parse_str(target) {
            return self.get(id).map(|contact| contact.id);
        }
        self.store
            .find_by_name(target)
            .map(|contact| contact.id)
            .ok_or_else(|| StoreError::NameNotFound(target.to_string()))
    }

    pub fn list(&self, order: ListOrder) -> Vec<&Contact> {
        let mut contacts: Vec<&Contact> = self.store.contacts().iter().collect();
        match order {
            ListOrder::Name => contacts.sort_by_cached_key(|contact| contact.name.to_lowercase()),
            ListOrder::FavoritesFirst => contacts
                .sort_by_cached_key(|contact| (!contact.favorite, contact.name.to_lowercase())),
        }
        contacts
    }

    pub fn find(&self, query: &str) -> StoreResult<Vec<&Contact>> {
        self.store.find(query)
    }

    pub fn add_contact(&mut self, contact: Contact) -> StoreResult<ContactId> {
        self.commit("contact_add", |store| store.add(contact))
    }

    pub fn update_contact(
        &mut self,
        id: ContactId,
        patch: &ContactPatch,
    ) -> StoreResult<Contact> {
        self.commit("contact_update", |store| store.update(id, patch).cloned())
    }

    pub fn delete_contact(&mut self, id: ContactId) -> StoreResult<Contact> {
        self.commit("contact_delete", |store| store.delete(id))
    }

    /// Restores the collection captured before the most recent write.
    ///
    /// # Errors
    /// - `NothingToUndo` when there is no write to revert.
    pub fn undo(&mut self) -> StoreResult<()> {
        self.snapshots.undo(&mut self.store)
    }

    pub fn find_duplicates(&self) -> Vec<DuplicateCandidate> {
        self.matcher.find_candidates(self.store.contacts())
    }

    /// Merges `secondary` into `primary` and removes `secondary`.
    pub fn merge_pair(
        &mut self,
        primary_id: ContactId,
        secondary_id: ContactId,
    ) -> StoreResult<Contact> {
        if primary_id == secondary_id {
            return Err(StoreError::SelfMerge(primary_id));
        }
        let merged = merge(self.get(primary_id)?, self.get(secondary_id)?)?;
        self.commit("contact_merge", move |store| {
            store.replace(merged.clone())?;
            store.delete(secondary_id)?;
            Ok(merged)
        })
    }

    /// Walks the duplicate candidates and merges every pair `decide` accepts.
    ///
    /// The earlier record in store order is the primary. The whole pass is one
    /// write: a single undo reverts all merges it made. Pairs that cannot be
    /// merged are recorded in the error sink and skipped.
    pub fn auto_merge<F>(&mut self, mut decide: F) -> StoreResult<MergeReport>
    where
        F: FnMut(&DuplicateCandidate, &Contact, &Contact) -> bool,
    {
        let candidates = self.find_duplicates();
        let before = Snapshot::of(&self.store);
        let mut report = MergeReport::default();
        let mut absorbed: HashSet<ContactId> = HashSet::new();

        for candidate in &candidates {
            if absorbed.contains(&candidate.first) || absorbed.contains(&candidate.second) {
                report.skipped += 1;
                continue;
            }
            let Some((primary, secondary)) = self.ordered_pair(candidate) else {
                report.skipped += 1;
                continue;
            };
            if !decide(candidate, &primary, &secondary) {
                report.declined += 1;
                continue;
            }

            let applied = merge(&primary, &secondary).and_then(|merged| self.store.replace(merged));
            if let Err(err) = applied {
                self.sink
                    .record(&Fault::new("auto_merge", &err).for_record(primary.id));
                report.conflicts += 1;
                continue;
            }
            if let Err(err) = self.store.delete(secondary.id) {
                let _ = self.store.replace_all(before.into_contacts());
                return Err(err);
            }
            absorbed.insert(secondary.id);
            report.merged.push((primary.id, secondary.id));
        }

        if !report.merged.is_empty() {
            self.seal("contact_auto_merge", before)?;
        }
        Ok(report)
    }

    /// Appends every valid row of an external CSV file.
    ///
    /// Rows without a name are skipped; rows failing validation are recorded
    /// in the error sink and reported back.
    pub fn import_csv(&mut self, path: &Path) -> StoreResult<ImportReport> {
        let file = File::open(path).map_err(|err| StoreError::io("open", path, err))?;
        let rows = read_rows(BufReader::new(file), path)?;
        let (accepted, rejected) = decode_import(rows);
        for rejection in &rejected {
            self.sink.record(&Fault::new(
                "import_csv",
                format!(
                    "{} line {}: {}",
                    path.display(),
                    rejection.line,
                    rejection.reason
                ),
            ));
        }

        let imported = accepted.len();
        if imported > 0 {
            self.commit("contact_import_csv", |store| {
                for contact in accepted {
                    store.add(contact)?;
                }
                Ok(())
            })?;
        }
        Ok(ImportReport { imported, rejected })
    }

    /// Replaces the whole collection with the contents of a JSON export.
    pub fn import_json(&mut self, path: &Path) -> StoreResult<usize> {
        let contacts = read_json(path)?;
        let count = contacts.len();
        self.commit("contact_import_json", |store| store.replace_all(contacts))?;
        Ok(count)
    }

    pub fn export_json(&self, path: &Path) -> StoreResult<usize> {
        export_json(self.store.contacts(), path)?;
        Ok(self.store.len())
    }

    /// Writes the selected contacts (all when `ids` is empty) as vCards.
    pub fn export_vcard(&self, ids: &[ContactId], path: &Path) -> StoreResult<usize> {
        let selected: Vec<&Contact> = if ids.is_empty() {
            self.store.contacts().iter().collect()
        } else {
            ids.iter()
                .map(|id| self.get(*id))
                .collect::<StoreResult<_>>()?
        };
        export_vcards(&selected, path)?;
        Ok(selected.len())
    }

    pub fn manual_backup(&self) -> StoreResult<PathBuf> {
        self.backups.manual_backup(self.store.path())
    }

    pub fn list_backups(&self) -> StoreResult<Vec<String>> {
        self.backups.list_backups()
    }

    /// Replaces the collection with a backup's contents; undoable.
    pub fn restore_backup(&mut self, name: &str) -> StoreResult<usize> {
        let path = self.backups.resolve(name)?;
        let file = File::open(&path).map_err(|err| StoreError::io("open", &path, err))?;
        let contacts = decode_stored(read_rows(BufReader::new(file), &path)?, &path)?;
        let count = contacts.len();
        self.commit("backup_restore", |store| store.replace_all(contacts))?;
        Ok(count)
    }

    fn ordered_pair(&self, candidate: &DuplicateCandidate) -> Option<(Contact, Contact)> {
        let first = self.store.position(candidate.first)?;
        let second = self.store.position(candidate.second)?;
        let contacts = self.store.contacts();
        if first <= second {
            Some((contacts[first].clone(), contacts[second].clone()))
        } else {
            Some((contacts[second].clone(), contacts[first].clone()))
        }
    }

    fn commit<T, F>(&mut self, operation: &'static str, mutate: F) -> StoreResult<T>
    where
        F: FnOnce(&mut RecordStore) -> StoreResult<T>,
    {
        let before = Snapshot::of(&self.store);
        let value = mutate(&mut self.store)?;
        self.seal(operation, before)?;
        Ok(value)
    }

    fn seal(&mut self, operation: &'static str, before: Snapshot) -> StoreResult<()> {
        let previous = self.snapshots.capture(before);
        if let Err(err) = self.store.persist() {
            if let Some(before) = self.snapshots.reinstate(previous) {
                let _ = self.store.replace_all(before.into_contacts());
            }
            error!(
                "event={} module=service status=error error_code=persist_failed",
                operation
            );
            return Err(err);
        }
        let backup = self.backups.maybe_backup(self.store.path());
        info!(
            "event={} module=service status=ok records={} backup={}",
            operation,
            self.store.len(),
            backup.is_some()
        );
        Ok(())
    }
}
