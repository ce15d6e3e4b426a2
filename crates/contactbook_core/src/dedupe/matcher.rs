//! Pairwise near-duplicate detection.
//!
//! # Responsibility
//! - Score every unordered pair of contacts by name similarity.
//! - Return pairs at or above a threshold in a deterministic order.
//!
//! # Invariants
//! - Detection is read-only over the given records.
//! - Result order: score descending, then `(first, second)` ascending, with
//!   `first < second` inside each pair.
//! - Raising the threshold never adds results.
//!
//! Quadratic in the number of records; sized for a personal contact list.

use crate::dedupe::similarity::{SequenceRatio, Similarity, SimilarityKind};
use crate::model::contact::{Contact, ContactId};
use crate::repo::error::{StoreError, StoreResult};
use std::cmp::Ordering;

pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.8;

/// Two contacts proposed for merging.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCandidate {
    /// Lower of the two ids.
    pub first: ContactId,
    /// Higher of the two ids.
    pub second: ContactId,
    pub score: f64,
}

impl DuplicateCandidate {
    fn new(left: ContactId, right: ContactId, score: f64) -> Self {
        let (first, second) = if left <= right {
            (left, right)
        } else {
            (right, left)
        };
        Self {
            first,
            second,
            score,
        }
    }
}

/// Tunables for a detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub threshold: f64,
    /// Treat an exact phone or email match as a full-score duplicate signal.
    pub include_contact_info_in_score: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DUPLICATE_THRESHOLD,
            include_contact_info_in_score: false,
        }
    }
}

/// Detects near-duplicate contacts with a pluggable similarity measure.
pub struct DuplicateMatcher {
    similarity: Box<dyn Similarity>,
    options: MatchOptions,
}

impl DuplicateMatcher {
    /// Uses the sequence ratio measure.
    pub fn new(options: MatchOptions) -> StoreResult<Self> {
        Self::with_similarity(Box::new(SequenceRatio), options)
    }

    pub fn from_kind(kind: SimilarityKind, options: MatchOptions) -> StoreResult<Self> {
        Self::with_similarity(kind.build(), options)
    }

    /// # Errors
    /// - `InvalidThreshold` when the threshold is outside `[0, 1]` or NaN.
    pub fn with_similarity(
        similarity: Box<dyn Similarity>,
        options: MatchOptions,
    ) -> StoreResult<Self> {
        if !(0.0..=1.0).contains(&options.threshold) {
            return Err(StoreError::InvalidThreshold(options.threshold));
        }
        Ok(Self {
            similarity,
            options,
        })
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// Scores one pair of contacts.
    pub fn score(&self, left: &Contact, right: &Contact) -> f64 {
        let name_score = self
            .similarity
            .score(&comparable_name(left), &comparable_name(right))
            .clamp(0.0, 1.0);
        if self.options.include_contact_info_in_score && shares_contact_info(left, right) {
            return 1.0;
        }
        name_score
    }

    /// Returns every pair scoring at or above the threshold.
    pub fn find_candidates(&self, contacts: &[Contact]) -> Vec<DuplicateCandidate> {
        let mut candidates = Vec::new();
        for (index, left) in contacts.iter().enumerate() {
            for right in &contacts[index + 1..] {
                if left.id == right.id {
                    continue;
                }
                let score = self.score(left, right);
                if score >= self.options.threshold {
                    candidates.push(DuplicateCandidate::new(left.id, right.id, score));
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.first.cmp(&b.first))
                .then_with(|| a.second.cmp(&b.second))
        });
        candidates
    }
}

fn comparable_name(contact: &Contact) -> String {
    contact.name.trim().to_lowercase()
}

fn shares_contact_info(left: &Contact, right: &Contact) -> bool {
    let same_phone = !left.phone.is_empty() && left.phone == right.phone;
    let same_email = match (left.email.as_deref(), right.email.as_deref()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };
    same_phone || same_email
}
