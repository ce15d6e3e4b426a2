//! Store-level error taxonomy.

use crate::model::contact::{ContactId, ContactValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the record store and the services built on it.
#[derive(Debug)]
pub enum StoreError {
    /// Bad input shape; no state was changed.
    Validation(ContactValidationError),
    /// No contact with this id.
    NotFound(ContactId),
    /// No contact with this exact name.
    NameNotFound(String),
    /// Search pattern could not be compiled.
    Query { pattern: String, message: String },
    /// Backing file could not be parsed; nothing was loaded.
    StoreCorrupt {
        path: PathBuf,
        line: Option<u64>,
        message: String,
    },
    /// Undo requested with no retained snapshot.
    NothingToUndo,
    /// Neither record carries a name to keep.
    MergeConflict {
        primary: ContactId,
        secondary: ContactId,
    },
    /// A record cannot be merged into itself.
    SelfMerge(ContactId),
    /// Duplicate threshold outside `[0, 1]`.
    InvalidThreshold(f64),
    /// Two records in one collection share an id.
    DuplicateId(ContactId),
    /// Named backup file does not exist or is not a backup.
    BackupNotFound(String),
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Csv(csv::Error),
}

impl StoreError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(
        path: impl Into<PathBuf>,
        line: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        Self::StoreCorrupt {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Id of the record the error is about, when there is one.
    pub fn record_id(&self) -> Option<ContactId> {
        match self {
            Self::NotFound(id) | Self::SelfMerge(id) | Self::DuplicateId(id) => Some(*id),
            Self::MergeConflict { primary, .. } => Some(*primary),
            _ => None,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "contact not found: {id}"),
            Self::NameNotFound(name) => write!(f, "no contact named `{name}`"),
            Self::Query { pattern, message } => {
                write!(f, "invalid search pattern `{pattern}`: {message}")
            }
            Self::StoreCorrupt {
                path,
                line: Some(line),
                message,
            } => write!(f, "corrupt store `{}` at line {line}: {message}", path.display()),
            Self::StoreCorrupt {
                path,
                line: None,
                message,
            } => write!(f, "corrupt store `{}`: {message}", path.display()),
            Self::NothingToUndo => write!(f, "nothing to undo"),
            Self::MergeConflict { primary, secondary } => write!(
                f,
                "cannot merge {secondary} into {primary}: both names are empty"
            ),
            Self::SelfMerge(id) => write!(f, "cannot merge contact {id} into itself"),
            Self::InvalidThreshold(value) => {
                write!(f, "duplicate threshold {value} must be within [0, 1]")
            }
            Self::DuplicateId(id) => write!(f, "duplicate contact id: {id}"),
            Self::BackupNotFound(name) => write!(f, "backup not found: `{name}`"),
            Self::Io {
                action,
                path,
                source,
            } => write!(f, "failed to {action} `{}`: {source}", path.display()),
            Self::Json(err) => write!(f, "{err}"),
            Self::Csv(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ContactValidationError> for StoreError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<csv::Error> for StoreError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}
