//! Single-level undo snapshots.
//!
//! # Responsibility
//! - Retain a full copy of the collection as it was before the last write.
//! - Mirror that copy to a hidden side file so undo survives a restart.
//!
//! # Invariants
//! - At most one snapshot is held; capturing overwrites the previous one.
//! - Undo consumes the snapshot and is not itself undoable.
//! - Side-file failures never fail the enclosing operation.

use crate::error_sink::{ErrorSink, Fault};
use crate::model::contact::Contact;
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::record_store::{write_atomic, RecordStore};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Full copy of a record collection at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    contacts: Vec<Contact>,
}

impl Snapshot {
    /// Deep-copies the store's current collection.
    pub fn of(store: &RecordStore) -> Self {
        Self {
            contacts: store.contacts().to_vec(),
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn into_contacts(self) -> Vec<Contact> {
        self.contacts
    }
}

/// Owner of the single undo slot.
pub struct SnapshotManager {
    slot: Option<Snapshot>,
    side_file: Option<PathBuf>,
    sink: Arc<dyn ErrorSink>,
}

impl SnapshotManager {
    /// Keeps the snapshot in memory only.
    pub fn in_memory(sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            slot: None,
            side_file: None,
            sink,
        }
    }

    /// Mirrors the snapshot to `side_file`, restoring any snapshot left there
    /// by a previous process.
    ///
    /// An unreadable side file is recorded as a fault and ignored.
    pub fn mirrored(side_file: impl Into<PathBuf>, sink: Arc<dyn ErrorSink>) -> Self {
        let side_file = side_file.into();
        let slot = match read_side_file(&side_file) {
            Ok(slot) => slot,
            Err(err) => {
                sink.record(&Fault::new("snapshot_restore", &err));
                None
            }
        };
        Self {
            slot,
            side_file: Some(side_file),
            sink,
        }
    }

    pub fn has_snapshot(&self) -> bool {
        self.slot.is_some()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.slot.as_ref()
    }

    /// Retains `snapshot` and hands back the one it displaced.
    pub fn capture(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        if let Some(path) = &self.side_file {
            let mirrored = write_atomic(path, |writer| {
                serde_json::to_writer(&mut *writer, &snapshot)?;
                writer
                    .write_all(b"\n")
                    .map_err(|err| StoreError::io("write", path, err))
            });
            if let Err(err) = mirrored {
                self.sink.record(&Fault::new("snapshot_capture", &err));
            }
        }
        info!(
            "event=snapshot_capture module=safety status=ok records={}",
            snapshot.contacts.len()
        );
        self.slot.replace(snapshot)
    }

    /// Puts back a slot returned by [`SnapshotManager::capture`] after the
    /// write it guarded failed to persist, returning the discarded snapshot.
    pub fn reinstate(&mut self, previous: Option<Snapshot>) -> Option<Snapshot> {
        let discarded = self.slot.take();
        match previous {
            Some(snapshot) => {
                self.capture(snapshot);
            }
            None => self.clear(),
        }
        discarded
    }

    /// Restores the retained snapshot into `store` and persists it.
    ///
    /// # Errors
    /// - `NothingToUndo` when no snapshot is held.
    /// - Persist failures; the store keeps its current collection and the
    ///   snapshot stays available for another attempt.
    pub fn undo(&mut self, store: &mut RecordStore) -> StoreResult<()> {
        let snapshot = self.slot.as_ref().ok_or(StoreError::NothingToUndo)?;
        let current = store.contacts().to_vec();
        store.replace_all(snapshot.contacts.clone())?;

        if let Err(err) = store.persist() {
            let _ = store.replace_all(current);
            return Err(err);
        }

        let restored = snapshot.contacts.len();
        self.clear();
        info!("event=undo module=safety status=ok records={restored}");
        Ok(())
    }

    /// Drops the retained snapshot and its side file.
    pub fn clear(&mut self) {
        self.slot = None;
        let Some(path) = &self.side_file else {
            return;
        };
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                warn!(
                    "event=snapshot_clear module=safety status=error path={}",
                    path.display()
                );
                self.sink.record(&Fault::new(
                    "snapshot_clear",
                    StoreError::io("remove", path, err),
                ));
            }
        }
    }
}

fn read_side_file(path: &Path) -> StoreResult<Option<Snapshot>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StoreError::io("read", path, err)),
    };
    let snapshot = serde_json::from_str(&text)?;
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::{Snapshot, SnapshotManager};
    use crate::error_sink::MemoryErrorSink;
    use crate::model::contact::Contact;
    use crate::repo::error::StoreError;
    use crate::repo::record_store::RecordStore;
    use std::sync::Arc;

    #[test]
    fn undo_without_snapshot_fails() {
        let mut manager = SnapshotManager::in_memory(Arc::new(MemoryErrorSink::new()));
        let mut store = RecordStore::new("unused.csv");
        assert!(matches!(
            manager.undo(&mut store),
            Err(StoreError::NothingToUndo)
        ));
    }

    #[test]
    fn capture_overwrites_previous_snapshot() {
        let mut manager = SnapshotManager::in_memory(Arc::new(MemoryErrorSink::new()));
        let mut store = RecordStore::new("unused.csv");

        manager.capture(Snapshot::of(&store));
        store.add(Contact::new("Ann")).unwrap();
        manager.capture(Snapshot::of(&store));

        assert_eq!(manager.snapshot().unwrap().contacts().len(), 1);
    }

    #[test]
    fn side_file_survives_a_new_manager_and_is_removed_by_undo() {
        let dir = tempfile::tempdir().unwrap();
        let side_file = dir.path().join(".contacts.snapshot.json");
        let mut store = RecordStore::new(dir.path().join("contacts.csv"));
        store.add(Contact::new("Ann")).unwrap();
        let before = Snapshot::of(&store);

        {
            let sink = Arc::new(MemoryErrorSink::new());
            let mut manager = SnapshotManager::mirrored(&side_file, sink);
            manager.capture(before.clone());
        }
        assert!(side_file.exists());

        store.add(Contact::new("Bob")).unwrap();
        let sink = Arc::new(MemoryErrorSink::new());
        let mut manager = SnapshotManager::mirrored(&side_file, sink.clone());
        assert_eq!(manager.snapshot(), Some(&before));

        manager.undo(&mut store).unwrap();
        assert_eq!(store.contacts(), before.contacts());
        assert!(!side_file.exists());
        assert!(!manager.has_snapshot());
        assert!(sink.faults().is_empty());
    }

    #[test]
    fn unreadable_side_file_is_recorded_and_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let side_file = dir.path().join(".contacts.snapshot.json");
        std::fs::write(&side_file, "{not json").unwrap();

        let sink = Arc::new(MemoryErrorSink::new());
        let manager = SnapshotManager::mirrored(&side_file, sink.clone());
        assert!(!manager.has_snapshot());
        assert_eq!(sink.faults().len(), 1);
        assert_eq!(sink.faults()[0].operation, "snapshot_restore");
    }
}
