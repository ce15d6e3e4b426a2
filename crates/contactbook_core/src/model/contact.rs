//! Contact domain model.
//!
//! # Responsibility
//! - Define the canonical contact record persisted by the store.
//! - Own record-level validation used by every write path.
//!
//! # Invariants
//! - `id` is stable and never reused for another contact.
//! - `name` is non-blank after trim.
//! - `phone` contains only ASCII digits (empty means "no phone").
//! - `email`, when present, matches the basic `local@domain.tld` shape.

use crate::model::normalize::{is_valid_email, is_valid_phone, normalize_phone};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Separator joining tags inside the single CSV `tags` column.
pub const TAG_SEPARATOR: char = ';';

/// Stable identifier for one contact record.
pub type ContactId = Uuid;

/// Validation failures for contact records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    EmptyName,
    InvalidPhone(String),
    InvalidEmail(String),
    InvalidTag(String),
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "contact name must not be blank"),
            Self::InvalidPhone(value) => {
                write!(f, "phone `{value}` must contain 7 to 15 digits")
            }
            Self::InvalidEmail(value) => write!(f, "email `{value}` is not a valid address"),
            Self::InvalidTag(value) => {
                write!(f, "tag `{value}` must not contain `{TAG_SEPARATOR}`")
            }
        }
    }
}

impl Error for ContactValidationError {}

/// Canonical contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Stable ID assigned at creation.
    pub id: ContactId,
    pub name: String,
    /// Digits-only canonical phone; empty string means no phone.
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Display order is insertion order.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
}

impl Contact {
    /// Creates a contact with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a contact with a caller-provided ID.
    ///
    /// Used by load/import paths where identity already exists.
    pub fn with_id(id: ContactId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phone: String::new(),
            email: None,
            tags: Vec::new(),
            favorite: false,
        }
    }

    /// Builder-style phone setter; the value is normalized.
    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = normalize_phone(phone);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    /// Canonicalizes free-form fields in place.
    ///
    /// Trims name/email, strips phone separators, drops blank tags and
    /// collapses a blank email to `None`.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.phone = normalize_phone(&self.phone);
        self.email = self
            .email
            .take()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self.tags = self
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Validates record-level invariants.
    ///
    /// Expects normalized input; see [`Contact::normalize`].
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.name.trim().is_empty() {
            return Err(ContactValidationError::EmptyName);
        }
        if !self.phone.is_empty() && !is_valid_phone(&self.phone) {
            return Err(ContactValidationError::InvalidPhone(self.phone.clone()));
        }
        if let Some(email) = self.email.as_deref() {
            if !is_valid_email(email) {
                return Err(ContactValidationError::InvalidEmail(email.to_string()));
            }
        }
        if let Some(tag) = self.tags.iter().find(|tag| tag.contains(TAG_SEPARATOR)) {
            return Err(ContactValidationError::InvalidTag(tag.clone()));
        }
        Ok(())
    }

    /// Returns whether `tag` is attached to this contact (exact text).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|value| value == tag)
    }
}

/// Partial update for one contact.
///
/// `None` keeps the current value. For `email`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub favorite: Option<bool>,
}

impl ContactPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.tags.is_none()
            && self.favorite.is_none()
    }

    /// Returns a normalized copy of `base` with this patch applied.
    ///
    /// `base` itself is never modified, so callers can validate the result
    /// before committing it.
    pub fn apply_to(&self, base: &Contact) -> Contact {
        let mut next = base.clone();
        if let Some(name) = &self.name {
            next.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            next.phone = phone.clone();
        }
        if let Some(email) = &self.email {
            next.email = email.clone();
        }
        if let Some(tags) = &self.tags {
            next.tags = tags.clone();
        }
        if let Some(favorite) = self.favorite {
            next.favorite = favorite;
        }
        next.normalize();
        next
    }
}
