use contactbook_core::{
    BookConfig, Contact, ContactBook, FixedClock, MemoryErrorSink, StoreError,
};
use std::sync::Arc;
use tempfile::TempDir;

fn open_book(dir: &TempDir, sink: Arc<MemoryErrorSink>) -> ContactBook {
    ContactBook::open(
        &BookConfig::in_dir(dir.path()),
        Arc::new(FixedClock::on(2025, 11, 14).unwrap()),
        sink,
    )
    .unwrap()
}

fn found_names(book: &ContactBook, query: &str) -> Vec<String> {
    book.find(query)
        .unwrap()
        .into_iter()
        .map(|contact| contact.name.clone())
        .collect()
}

#[test]
fn regex_query_matches_names_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = open_book(&dir, Arc::new(MemoryErrorSink::new()));
    for name in ["Alice", "Bob", "Anna"] {
        book.add_contact(Contact::new(name)).unwrap();
    }

    assert_eq!(found_names(&book, "/^A/"), vec!["Alice", "Anna"]);
    assert!(matches!(
        book.find("/[unclosed/"),
        Err(StoreError::Query { .. })
    ));
}

#[test]
fn plain_query_matches_name_phone_or_tag() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = open_book(&dir, Arc::new(MemoryErrorSink::new()));
    let alice = Contact::new("Alice Wong").with_phone("(555) 123-4567");
    book.add_contact(alice).unwrap();
    book.add_contact(Contact::new("Bob").with_tags(["climbing"])).unwrap();

    assert_eq!(found_names(&book, "wong"), vec!["Alice Wong"]);
    assert_eq!(found_names(&book, "555.123.4567"), vec!["Alice Wong"]);
    assert_eq!(found_names(&book, "climbing"), vec!["Bob"]);
    assert!(found_names(&book, "Climb").is_empty());
    assert!(found_names(&book, "   ").is_empty());
}

#[test]
fn csv_import_appends_valid_rows_and_records_rejects() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemoryErrorSink::new());
    let mut book = open_book(&dir, sink.clone());
    book.add_contact(Contact::new("Existing")).unwrap();

    let source = dir.path().join("legacy.csv");
    std::fs::write(
        &source,
        "name,phone,email,tags,favorite\n\
         Gaurav,+91 98765-43210,gaurav@example.com,\"friends, cricket\",yes\n\
         Broken,12,,,\n\
         ,5551234567,,,\n",
    )
    .unwrap();

    let report = book.import_csv(&source).unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].line, 3);
    assert_eq!(sink.faults().len(), 1);
    assert_eq!(sink.faults()[0].operation, "import_csv");

    let gaurav = book.find("gaurav").unwrap()[0].clone();
    assert_eq!(gaurav.phone, "919876543210");
    assert_eq!(gaurav.tags, vec!["friends", "cricket"]);
    assert!(gaurav.favorite);
    assert_eq!(book.store().len(), 2);

    book.undo().unwrap();
    assert_eq!(book.store().len(), 1);
}

#[test]
fn json_export_then_import_restores_collection() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = open_book(&dir, Arc::new(MemoryErrorSink::new()));
    let ann = book
        .add_contact(Contact::new("Ann").with_email("ann@example.com"))
        .unwrap();
    book.add_contact(Contact::new("Bob")).unwrap();
    let export = dir.path().join("export.json");

    assert_eq!(book.export_json(&export).unwrap(), 2);
    book.delete_contact(ann).unwrap();
    book.add_contact(Contact::new("Cy")).unwrap();

    assert_eq!(book.import_json(&export).unwrap(), 2);
    assert_eq!(book.get(ann).unwrap().email.as_deref(), Some("ann@example.com"));
    assert!(book.find("Cy").unwrap().is_empty());
}

#[test]
fn invalid_json_import_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = open_book(&dir, Arc::new(MemoryErrorSink::new()));
    book.add_contact(Contact::new("Ann")).unwrap();
    let source = dir.path().join("bad.json");
    std::fs::write(&source, r#"[{"name": "Ok", "email": "not-an-email"}]"#).unwrap();

    assert!(matches!(
        book.import_json(&source),
        Err(StoreError::Validation(_))
    ));
    assert_eq!(book.store().len(), 1);
}

#[test]
fn vcard_export_selects_contacts() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = open_book(&dir, Arc::new(MemoryErrorSink::new()));
    let ann = book
        .add_contact(Contact::new("Ann").with_phone("555-123-4567"))
        .unwrap();
    book.add_contact(Contact::new("Bob")).unwrap();

    let one = dir.path().join("ann.vcf");
    assert_eq!(book.export_vcard(&[ann], &one).unwrap(), 1);
    let text = std::fs::read_to_string(&one).unwrap();
    assert!(text.contains("FN:Ann\r\n"));
    assert!(text.contains("TEL:5551234567\r\n"));

    let all = dir.path().join("all.vcf");
    assert_eq!(book.export_vcard(&[], &all).unwrap(), 2);

    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        book.export_vcard(&[missing], &all),
        Err(StoreError::NotFound(_))
    ));
}
