//! vCard 3.0 export.

use crate::model::contact::Contact;
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::record_store::write_atomic;
use std::io::Write;
use std::path::Path;

const LINE_END: &str = "\r\n";

/// Renders one contact as a vCard block.
///
/// `TEL` and `EMAIL` lines are omitted when the field is empty.
pub fn render_vcard(contact: &Contact) -> String {
    let mut card = String::new();
    push_line(&mut card, "BEGIN:VCARD");
    push_line(&mut card, "VERSION:3.0");
    push_line(&mut card, &format!("FN:{}", escape_text(&contact.name)));
    if !contact.phone.is_empty() {
        push_line(&mut card, &format!("TEL:{}", contact.phone));
    }
    if let Some(email) = contact.email.as_deref() {
        push_line(&mut card, &format!("EMAIL:{}", escape_text(email)));
    }
    push_line(&mut card, "END:VCARD");
    card
}

/// Writes one file holding a vCard block per contact.
pub fn export_vcards(contacts: &[&Contact], path: &Path) -> StoreResult<()> {
    write_atomic(path, |writer| {
        for contact in contacts {
            writer
                .write_all(render_vcard(contact).as_bytes())
                .map_err(|err| StoreError::io("write", path, err))?;
        }
        Ok(())
    })
}

/// File name derived from the contact name, e.g. `Jon_Smith.vcf`.
pub fn default_vcard_file_name(contact: &Contact) -> String {
    let stem: String = contact
        .name
        .trim()
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    format!("{stem}.vcf")
}

fn push_line(card: &mut String, line: &str) {
    card.push_str(line);
    card.push_str(LINE_END);
}

fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ',' => escaped.push_str("\\,"),
            ';' => escaped.push_str("\\;"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}
