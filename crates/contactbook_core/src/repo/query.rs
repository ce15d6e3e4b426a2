//! Contact search queries.
//!
//! # Invariants
//! - Plain queries match on name substring (case-insensitive), normalized
//!   phone equality or exact tag text. Phone equality only applies to
//!   queries made of digits and dialing punctuation.
//! - `/pattern/` queries match the regex against the name only.
//! - Parsing never touches the store; a bad pattern fails before any scan.

use crate::model::contact::Contact;
use crate::model::normalize::normalize_phone;
use crate::repo::error::{StoreError, StoreResult};
use regex::{Regex, RegexBuilder};

const PHONE_PUNCTUATION: &str = " ()-.+";

/// Parsed search query.
#[derive(Debug, Clone)]
pub enum ContactQuery {
    /// Blank input; matches nothing.
    Empty,
    Text {
        raw: String,
        lowered: String,
        phone: String,
    },
    Pattern(Regex),
}

impl ContactQuery {
    /// Parses user input into a query.
    ///
    /// # Errors
    /// - `StoreError::Query` when a `/…/` pattern does not compile.
    pub fn parse(input: &str) -> StoreResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::Empty);
        }

        if let Some(pattern) = regex_body(trimmed) {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|err| StoreError::Query {
                    pattern: pattern.to_string(),
                    message: err.to_string(),
                })?;
            return Ok(Self::Pattern(regex));
        }

        let phone = if looks_like_phone(trimmed) {
            normalize_phone(trimmed)
        } else {
            String::new()
        };
        Ok(Self::Text {
            raw: trimmed.to_string(),
            lowered: trimmed.to_lowercase(),
            phone,
        })
    }

    pub fn matches(&self, contact: &Contact) -> bool {
        match self {
            Self::Empty => false,
            Self::Pattern(regex) => regex.is_match(&contact.name),
            Self::Text {
                raw,
                lowered,
                phone,
            } => {
                contact.name.to_lowercase().contains(lowered.as_str())
                    || (!phone.is_empty() && contact.phone == *phone)
                    || contact.has_tag(raw)
            }
        }
    }
}

/// Only digits and dialing punctuation, e.g. `(555) 123-4567` or `+1 555.1111`.
fn looks_like_phone(query: &str) -> bool {
    query.chars().any(|ch| ch.is_ascii_digit())
        && query
            .chars()
            .all(|ch| ch.is_ascii_digit() || PHONE_PUNCTUATION.contains(ch))
}

fn regex_body(query: &str) -> Option<&str> {
    if query.len() < 2 {
        return None;
    }
    query.strip_prefix('/')?.strip_suffix('/')
}

#[cfg(test)]
mod tests {
    use super::ContactQuery;
    use crate::model::contact::Contact;
    use crate::repo::error::StoreError;

    #[test]
    fn slash_delimited_input_is_a_name_regex() {
        let query = ContactQuery::parse("/^A/").unwrap();
        assert!(query.matches(&Contact::new("Alice")));
        assert!(!query.matches(&Contact::new("Bob")));
    }

    #[test]
    fn single_slash_is_plain_text() {
        let query = ContactQuery::parse("/").unwrap();
        assert!(matches!(query, ContactQuery::Text { .. }));
    }

    #[test]
    fn malformed_regex_is_query_error() {
        let err = ContactQuery::parse("/[a-/").unwrap_err();
        assert!(matches!(err, StoreError::Query { pattern, .. } if pattern == "[a-"));
    }

    #[test]
    fn plain_text_matches_phone_and_tag() {
        let contact = Contact::new("Jon")
            .with_phone("555-1111")
            .with_tags(["Climbing"]);
        assert!(ContactQuery::parse("(555) 1111").unwrap().matches(&contact));
        assert!(ContactQuery::parse("Climbing").unwrap().matches(&contact));
        assert!(!ContactQuery::parse("climb").unwrap().matches(&contact));
        assert!(!ContactQuery::parse("   ").unwrap().matches(&contact));
    }

    #[test]
    fn mixed_text_does_not_match_by_phone_digits() {
        let jon = Contact::new("Jon").with_phone("555-1111");
        let ann = Contact::new("Ann").with_phone("555-1111");
        let query = ContactQuery::parse("John 5551111").unwrap();
        assert!(!query.matches(&jon));
        assert!(!query.matches(&ann));
        assert!(ContactQuery::parse("+555.1111").unwrap().matches(&ann));
    }
}
