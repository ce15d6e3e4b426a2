//! CSV codec for the contact store file.
//!
//! # Responsibility
//! - Map store rows to `Contact` records and back.
//! - Accept the id-less legacy layout (`name,phone,email,tags,favorite`).
//!
//! # Invariants
//! - Written files always carry the full header, even when empty.
//! - Strict decoding is all-or-nothing: one bad row fails the whole file.

use crate::model::contact::{Contact, TAG_SEPARATOR};
use crate::model::normalize::normalize_phone;
use crate::repo::error::{StoreError, StoreResult};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;
use uuid::Uuid;

pub const STORE_HEADER: [&str; 6] = ["id", "name", "phone", "email", "tags", "favorite"];
const LEGACY_TAG_SEPARATOR: char = ',';

/// Undecoded row with the header already resolved.
#[derive(Debug, Clone, Default)]
pub(crate) struct CsvRow {
    pub line: u64,
    pub id: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub tags: Vec<String>,
    pub favorite: String,
}

/// A row dropped by lenient decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub line: u64,
    pub reason: String,
}

struct Columns {
    id: Option<usize>,
    name: usize,
    phone: Option<usize>,
    email: Option<usize>,
    tags: Option<usize>,
    favorite: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Option<Self> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(wanted))
        };
        Some(Self {
            id: find("id"),
            name: find("name")?,
            phone: find("phone"),
            email: find("email"),
            tags: find("tags"),
            favorite: find("favorite"),
        })
    }
}

/// Reads every row of a contact CSV.
///
/// An empty input (no header) yields no rows.
pub(crate) fn read_rows<R: Read>(reader: R, source: &Path) -> StoreResult<Vec<CsvRow>> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|err| StoreError::corrupt(source, Some(1), err.to_string()))?
        .clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    let columns = Columns::resolve(&headers)
        .ok_or_else(|| StoreError::corrupt(source, Some(1), "header has no `name` column"))?;
    let tag_separator = if columns.id.is_some() {
        TAG_SEPARATOR
    } else {
        LEGACY_TAG_SEPARATOR
    };

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| {
            let line = err.position().map(|pos| pos.line());
            StoreError::corrupt(source, line, err.to_string())
        })?;
        let field = |index: Option<usize>| {
            index
                .and_then(|index| record.get(index))
                .unwrap_or_default()
                .to_string()
        };
        rows.push(CsvRow {
            line: record.position().map(|pos| pos.line()).unwrap_or_default(),
            id: columns.id.map(|index| field(Some(index))),
            name: field(Some(columns.name)),
            phone: field(columns.phone),
            email: field(columns.email),
            tags: split_tags(&field(columns.tags), tag_separator),
            favorite: field(columns.favorite),
        });
    }
    Ok(rows)
}

/// Decodes store rows; any malformed row fails the whole batch.
pub(crate) fn decode_stored(rows: Vec<CsvRow>, source: &Path) -> StoreResult<Vec<Contact>> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut contacts = Vec::with_capacity(rows.len());

    for row in rows {
        let line = Some(row.line);
        if row.name.is_empty() {
            return Err(StoreError::corrupt(source, line, "row is missing a name"));
        }
        let id = match row.id.as_deref() {
            None => Uuid::new_v4(),
            Some("") => return Err(StoreError::corrupt(source, line, "row is missing an id")),
            Some(text) => Uuid::parse_str(text).map_err(|_| {
                StoreError::corrupt(source, line, format!("invalid id `{text}`"))
            })?,
        };
        if !seen.insert(id) {
            return Err(StoreError::corrupt(
                source,
                line,
                format!("duplicate id `{id}`"),
            ));
        }
        let favorite = parse_favorite(&row.favorite).ok_or_else(|| {
            StoreError::corrupt(
                source,
                line,
                format!("invalid favorite value `{}`", row.favorite),
            )
        })?;

        contacts.push(Contact {
            id,
            name: row.name,
            phone: normalize_phone(&row.phone),
            email: Some(row.email).filter(|email| !email.is_empty()),
            tags: row.tags,
            favorite,
        });
    }

    Ok(contacts)
}

/// Decodes rows from an external file, skipping rows that do not validate.
///
/// Every accepted contact gets a fresh id; ids in the source are ignored.
pub(crate) fn decode_import(rows: Vec<CsvRow>) -> (Vec<Contact>, Vec<RowRejection>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for row in rows {
        if row.name.is_empty() {
            continue;
        }
        let mut contact = Contact::new(row.name);
        contact.phone = row.phone;
        contact.email = Some(row.email);
        contact.tags = row.tags;
        contact.favorite = parse_favorite(&row.favorite).unwrap_or(false);
        contact.normalize();

        match contact.validate() {
            Ok(()) => accepted.push(contact),
            Err(err) => rejected.push(RowRejection {
                line: row.line,
                reason: err.to_string(),
            }),
        }
    }

    (accepted, rejected)
}

/// Writes the header and one row per contact.
pub(crate) fn write_contacts<W: Write>(writer: W, contacts: &[Contact]) -> StoreResult<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(STORE_HEADER)?;
    let separator = TAG_SEPARATOR.to_string();
    for contact in contacts {
        let id = contact.id.to_string();
        let tags = contact.tags.join(separator.as_str());
        csv_writer.write_record([
            id.as_str(),
            contact.name.as_str(),
            contact.phone.as_str(),
            contact.email.as_deref().unwrap_or_default(),
            tags.as_str(),
            if contact.favorite { "true" } else { "false" },
        ])?;
    }
    csv_writer
        .flush()
        .map_err(|err| StoreError::Csv(err.into()))?;
    Ok(())
}

fn split_tags(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_favorite(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "n" => Some(false),
        "1" | "true" | "yes" | "y" => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_import, decode_stored, parse_favorite, read_rows, write_contacts};
    use crate::model::contact::Contact;
    use crate::repo::error::StoreError;
    use std::path::Path;

    fn decode(text: &str) -> Result<Vec<Contact>, StoreError> {
        let source = Path::new("contacts.csv");
        let rows = read_rows(text.as_bytes(), source)?;
        decode_stored(rows, source)
    }

    #[test]
    fn written_rows_decode_to_same_contacts() {
        let contacts = vec![
            Contact::new("Alice, Jr.")
                .with_phone("555-123-4567")
                .with_email("alice@example.com")
                .with_tags(["work", "book club"])
                .with_favorite(true),
            Contact::new("Bob"),
        ];
        let mut buffer = Vec::new();
        write_contacts(&mut buffer, &contacts).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("id,name,phone,email,tags,favorite\n"));
        assert_eq!(decode(&text).unwrap(), contacts);
    }

    #[test]
    fn awkward_field_values_survive_write_and_read() {
        let contacts = vec![
            Contact::new(r#"Dwayne "The Rock" Johnson"#).with_tags([r#"say "hi""#]),
            Contact::new("Line one\nline two").with_email("multi.line+tag@example.com"),
            Contact::new("Rock, Paper").with_tags(["rock, paper", "scissors,"]),
            Contact::new("Zoë Ñúñez").with_tags(["café", "東京"]),
            Contact::new("李小龍").with_phone("+86 10 1234 5678"),
            Contact::new("O'Brien").with_tags(["a\tb"]),
            Contact::new("Trailing comma,").with_favorite(true),
        ];
        for contact in &contacts {
            contact.validate().unwrap();
        }

        let mut buffer = Vec::new();
        write_contacts(&mut buffer, &contacts).unwrap();
        let decoded = decode(&String::from_utf8(buffer).unwrap()).unwrap();

        assert_eq!(decoded.len(), contacts.len());
        for (written, read) in contacts.iter().zip(&decoded) {
            assert_eq!(read, written, "round trip changed {:?}", written.name);
        }
    }

    #[test]
    fn legacy_layout_gets_fresh_ids_and_comma_tags() {
        let text = "name,phone,email,tags,favorite\nGaurav,(555) 000-1111,,\"a,b\",1\n";
        let contacts = decode(text).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].phone, "5550001111");
        assert_eq!(contacts[0].tags, vec!["a", "b"]);
        assert!(contacts[0].favorite);
        assert_eq!(contacts[0].email, None);
    }

    #[test]
    fn missing_name_or_bad_id_is_corrupt() {
        let nameless = "id,name,phone,email,tags,favorite\n\
                        7d4f2c1e-8a6b-4c1d-9e2f-0a1b2c3d4e5f,,555,,,false\n";
        assert!(matches!(
            decode(nameless),
            Err(StoreError::StoreCorrupt { line: Some(2), .. })
        ));

        let bad_id = "id,name,phone,email,tags,favorite\nnot-a-uuid,Ann,,,,false\n";
        assert!(matches!(decode(bad_id), Err(StoreError::StoreCorrupt { .. })));
    }

    #[test]
    fn ragged_row_is_corrupt() {
        let text = "id,name,phone,email,tags,favorite\nabc,Ann\n";
        assert!(matches!(decode(text), Err(StoreError::StoreCorrupt { .. })));
    }

    #[test]
    fn empty_input_has_no_rows() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn import_skips_nameless_and_reports_invalid_rows() {
        let text = "name,phone,email,tags,favorite\n\
                    ,5551234567,,,\n\
                    Zed,12,,,\n\
                    Yan,555 123 4567,yan@example.com,,yes\n";
        let rows = read_rows(text.as_bytes(), Path::new("import.csv")).unwrap();
        let (accepted, rejected) = decode_import(rows);

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].name, "Yan");
        assert!(accepted[0].favorite);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].line, 3);
    }

    #[test]
    fn favorite_tokens() {
        assert_eq!(parse_favorite("TRUE"), Some(true));
        assert_eq!(parse_favorite(""), Some(false));
        assert_eq!(parse_favorite("maybe"), None);
    }
}
