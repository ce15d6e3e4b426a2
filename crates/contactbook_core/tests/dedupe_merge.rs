use contactbook_core::{
    BookConfig, Contact, ContactBook, DuplicateMatcher, FixedClock, MatchOptions,
    MemoryErrorSink, StoreError,
};
use std::sync::Arc;
use tempfile::TempDir;

fn open_book(dir: &TempDir, threshold: f64) -> ContactBook {
    let config = BookConfig {
        duplicate_threshold: threshold,
        ..BookConfig::in_dir(dir.path())
    };
    ContactBook::open(
        &config,
        Arc::new(FixedClock::on(2025, 11, 14).unwrap()),
        Arc::new(MemoryErrorSink::new()),
    )
    .unwrap()
}

fn sample_contacts() -> Vec<Contact> {
    vec![
        Contact::new("Jon Smith"),
        Contact::new("John Smith"),
        Contact::new("jon smith"),
        Contact::new("Jane Smyth"),
        Contact::new("Alice Wong"),
        Contact::new("Alicia Wong"),
        Contact::new("Bob"),
    ]
}

#[test]
fn threshold_one_returns_only_exact_names() {
    let contacts = sample_contacts();
    let matcher = DuplicateMatcher::new(MatchOptions {
        threshold: 1.0,
        ..MatchOptions::default()
    })
    .unwrap();

    let candidates = matcher.find_candidates(&contacts);
    assert_eq!(candidates.len(), 1);
    let pair = [candidates[0].first, candidates[0].second];
    assert!(pair.contains(&contacts[0].id));
    assert!(pair.contains(&contacts[2].id));
    assert_eq!(candidates[0].score, 1.0);
}

#[test]
fn raising_threshold_never_adds_candidates() {
    let contacts = sample_contacts();
    let mut previous = usize::MAX;
    for step in 0..=10 {
        let matcher = DuplicateMatcher::new(MatchOptions {
            threshold: f64::from(step) / 10.0,
            ..MatchOptions::default()
        })
        .unwrap();
        let count = matcher.find_candidates(&contacts).len();
        assert!(count <= previous, "threshold step {step} grew to {count}");
        previous = count;
    }
}

#[test]
fn candidates_are_sorted_by_score_then_ids() {
    let contacts = sample_contacts();
    let matcher = DuplicateMatcher::new(MatchOptions {
        threshold: 0.5,
        ..MatchOptions::default()
    })
    .unwrap();

    let candidates = matcher.find_candidates(&contacts);
    for window in candidates.windows(2) {
        let (a, b) = (&window[0], &window[1]);
        let same_score_in_id_order =
            a.score == b.score && (a.first, a.second) <= (b.first, b.second);
        assert!(a.score > b.score || same_score_in_id_order);
    }
    assert!(candidates.iter().all(|candidate| candidate.first < candidate.second));
}

#[test]
fn out_of_range_threshold_is_rejected() {
    assert!(matches!(
        DuplicateMatcher::new(MatchOptions {
            threshold: 1.5,
            ..MatchOptions::default()
        }),
        Err(StoreError::InvalidThreshold(_))
    ));
}

#[test]
fn near_duplicate_pair_merges_into_primary() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = open_book(&dir, 0.8);
    let jon = book
        .add_contact(Contact::new("Jon Smith").with_phone("555-1111"))
        .unwrap();
    let john = book
        .add_contact(Contact::new("John Smith").with_phone("555-1111"))
        .unwrap();

    let candidates = book.find_duplicates();
    assert_eq!(candidates.len(), 1);
    assert!(candidates[0].score >= 0.8);

    let merged = book.merge_pair(jon, john).unwrap();
    assert_eq!(merged.id, jon);
    assert_eq!(merged.name, "Jon Smith");
    assert_eq!(merged.phone, "5551111");
    assert_eq!(book.store().len(), 1);
    assert!(book.find("John").unwrap().is_empty());
    assert!(matches!(book.get(john), Err(StoreError::NotFound(_))));

    book.undo().unwrap();
    assert_eq!(book.store().len(), 2);
}

#[test]
fn merge_fills_gaps_from_secondary() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = open_book(&dir, 0.8);
    let primary = book
        .add_contact(Contact::new("Dana Ruiz").with_tags(["work"]))
        .unwrap();
    let secondary = book
        .add_contact(
            Contact::new("Dana Ruiz")
                .with_phone("5551234567")
                .with_email("dana@example.com")
                .with_tags(["work", "climbing"])
                .with_favorite(true),
        )
        .unwrap();

    let merged = book.merge_pair(primary, secondary).unwrap();
    assert_eq!(merged.phone, "5551234567");
    assert_eq!(merged.email.as_deref(), Some("dana@example.com"));
    assert_eq!(merged.tags, vec!["work", "climbing"]);
    assert!(merged.favorite);
}

#[test]
fn merging_a_record_with_itself_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = open_book(&dir, 0.8);
    let id = book.add_contact(Contact::new("Ann")).unwrap();
    assert!(matches!(
        book.merge_pair(id, id),
        Err(StoreError::SelfMerge(_))
    ));
    assert!(!book.find("Ann").unwrap().is_empty());
}

#[test]
fn auto_merge_is_one_undoable_pass() {
    let dir = tempfile::tempdir().unwrap();
    let mut book = open_book(&dir, 0.8);
    let first = book.add_contact(Contact::new("Jon Smith")).unwrap();
    book.add_contact(Contact::new("John Smith")).unwrap();
    book.add_contact(Contact::new("jon smith")).unwrap();
    let alice = book.add_contact(Contact::new("Alice Wong")).unwrap();
    book.add_contact(Contact::new("Alicia Wong")).unwrap();

    let mut offered = 0;
    let report = book
        .auto_merge(|_, primary, _| {
            offered += 1;
            primary.id != alice
        })
        .unwrap();

    assert_eq!(report.merged.len(), 2);
    assert!(report.merged.iter().all(|(primary, _)| *primary == first));
    assert_eq!(report.declined, 1);
    assert_eq!(offered, report.merged.len() + report.declined);
    assert_eq!(book.store().len(), 3);

    book.undo().unwrap();
    assert_eq!(book.store().len(), 5);
}
