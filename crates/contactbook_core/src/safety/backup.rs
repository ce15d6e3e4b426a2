//! Dated backups of the store file.
//!
//! # Responsibility
//! - Keep at most one automatic backup per calendar day.
//! - Offer on-demand backups and lookup of existing backup files.
//!
//! # Invariants
//! - Backup files are created once and never overwritten or deleted.
//! - Automatic backup failures are recorded and swallowed; they never fail
//!   the save that triggered them.

use crate::clock::Clock;
use crate::error_sink::{ErrorSink, Fault};
use crate::repo::error::{StoreError, StoreResult};
use chrono::NaiveDate;
use log::{debug, info};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

const DAILY_PREFIX: &str = "backup_";
const MANUAL_PREFIX: &str = "manual_backup_";
const BACKUP_EXTENSION: &str = ".csv";

/// Day key used in backup file names, e.g. `20251114`.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Creates and locates backup copies of the store file.
pub struct BackupScheduler {
    backup_dir: PathBuf,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ErrorSink>,
}

impl BackupScheduler {
    pub fn new(
        backup_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            clock,
            sink,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Copies `source` into today's backup slot unless it is already taken.
    ///
    /// Returns the created file, or `None` when no backup was written
    /// (already backed up today, missing source, or a recorded failure).
    pub fn maybe_backup(&self, source: &Path) -> Option<PathBuf> {
        match self.try_daily_backup(source) {
            Ok(created) => created,
            Err(err) => {
                self.sink.record(&Fault::new("backup", err));
                None
            }
        }
    }

    /// Returns whether a daily backup exists for `date`.
    pub fn has_backup_for(&self, date: NaiveDate) -> StoreResult<bool> {
        let prefix = format!("{DAILY_PREFIX}{}", day_key(date));
        Ok(self
            .backup_names()?
            .iter()
            .any(|name| name.starts_with(&prefix)))
    }

    /// Writes a timestamped backup regardless of today's daily backup.
    pub fn manual_backup(&self, source: &Path) -> StoreResult<PathBuf> {
        let stamp = self.clock.now().format("%Y%m%d_%H%M%S");
        let target = self
            .backup_dir
            .join(format!("{MANUAL_PREFIX}{stamp}{BACKUP_EXTENSION}"));
        self.copy_new(source, &target)?;
        info!(
            "event=backup_manual module=safety status=ok path={}",
            target.display()
        );
        Ok(target)
    }

    /// Lists backup file names, oldest name first.
    pub fn list_backups(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .backup_names()?
            .into_iter()
            .filter(|name| name.ends_with(BACKUP_EXTENSION))
            .filter(|name| name.starts_with(DAILY_PREFIX) || name.starts_with(MANUAL_PREFIX))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Resolves a backup file name from [`BackupScheduler::list_backups`].
    pub fn resolve(&self, name: &str) -> StoreResult<PathBuf> {
        if self.list_backups()?.iter().any(|known| known == name) {
            Ok(self.backup_dir.join(name))
        } else {
            Err(StoreError::BackupNotFound(name.to_string()))
        }
    }

    fn try_daily_backup(&self, source: &Path) -> StoreResult<Option<PathBuf>> {
        if !source.exists() {
            debug!(
                "event=backup_daily module=safety status=skipped reason=no_source path={}",
                source.display()
            );
            return Ok(None);
        }
        let today = self.clock.today();
        if self.has_backup_for(today)? {
            return Ok(None);
        }

        let target = self
            .backup_dir
            .join(format!("{DAILY_PREFIX}{}{BACKUP_EXTENSION}", day_key(today)));
        self.copy_new(source, &target)?;
        info!(
            "event=backup_daily module=safety status=ok path={}",
            target.display()
        );
        Ok(Some(target))
    }

    fn backup_names(&self) -> StoreResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io("list", &self.backup_dir, err)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io("list", &self.backup_dir, err))?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Copies through a temp file and refuses to replace an existing target.
    fn copy_new(&self, source: &Path, target: &Path) -> StoreResult<()> {
        std::fs::create_dir_all(&self.backup_dir)
            .map_err(|err| StoreError::io("create directory", &self.backup_dir, err))?;
        let mut input = File::open(source).map_err(|err| StoreError::io("open", source, err))?;
        let mut temp = NamedTempFile::new_in(&self.backup_dir)
            .map_err(|err| StoreError::io("create temp file in", &self.backup_dir, err))?;
        std::io::copy(&mut input, temp.as_file_mut())
            .map_err(|err| StoreError::io("copy", source, err))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| StoreError::io("sync", temp.path(), err))?;
        temp.persist_noclobber(target)
            .map_err(|err| StoreError::io("create backup", target, err.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{day_key, BackupScheduler};
    use crate::clock::FixedClock;
    use crate::error_sink::MemoryErrorSink;
    use chrono::NaiveDate;
    use std::sync::Arc;

    #[test]
    fn day_key_is_compact_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert_eq!(day_key(date), "20250109");
    }

    #[test]
    fn missing_source_is_skipped_without_fault() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(MemoryErrorSink::new());
        let scheduler = BackupScheduler::new(
            dir.path().join("backups"),
            Arc::new(FixedClock::on(2025, 1, 9).unwrap()),
            sink.clone(),
        );

        assert!(scheduler
            .maybe_backup(&dir.path().join("missing.csv"))
            .is_none());
        assert!(sink.faults().is_empty());
    }

    #[test]
    fn unknown_backup_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = BackupScheduler::new(
            dir.path(),
            Arc::new(FixedClock::on(2025, 1, 9).unwrap()),
            Arc::new(MemoryErrorSink::new()),
        );
        assert!(scheduler.resolve("../contacts.csv").is_err());
    }
}
