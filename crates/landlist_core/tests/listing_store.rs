use chrono::{DateTime, Duration, TimeZone, Utc};
use landlist_core::lifecycle::add_calendar_months;
use landlist_core::{
    sanitize_all, seed_records, BlobStore, ContractType, EngineConfig, FileBlobStore, FixedClock,
    Listing, ListingStore, LoadSource, MemoryBlobStore, RecordingSink, Severity, StorageError,
    StorageResult, StoreError, DEFAULT_STORAGE_KEY,
};
use serde_json::{json, Value};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

fn store_with_blob(blob: &str) -> ListingStore<MemoryBlobStore, RecordingSink> {
    ListingStore::new(
        MemoryBlobStore::with_blob(DEFAULT_STORAGE_KEY, blob),
        RecordingSink::new(),
    )
    .with_clock(FixedClock(now()))
}

fn loaded_empty_store() -> ListingStore<MemoryBlobStore, RecordingSink> {
    let mut store = store_with_blob("[]");
    store.load();
    store.sink_mut().drain();
    store
}

fn draft(title: &str, code: &str) -> Listing {
    Listing {
        title: title.to_string(),
        code: code.to_string(),
        ..Listing::default()
    }
}

fn persisted(store: &ListingStore<MemoryBlobStore, RecordingSink>) -> Vec<Value> {
    let blob = store
        .blob_store()
        .peek(DEFAULT_STORAGE_KEY)
        .expect("collection should be persisted");
    serde_json::from_str::<Vec<Value>>(blob).unwrap()
}

/// Accepts reads, refuses every write.
struct ReadOnlyBlobs(MemoryBlobStore);

impl BlobStore for ReadOnlyBlobs {
    fn get_blob(&self, key: &str) -> StorageResult<Option<String>> {
        self.0.get_blob(key)
    }

    fn set_blob(&mut self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("read-only volume".to_string()))
    }
}

#[test]
fn load_sweeps_expired_listing_and_persists_the_rest() {
    let seven_months_ago = Utc.with_ymd_and_hms(2026, 3, 18, 12, 0, 0).unwrap();
    let blob = json!([
        { "id": 1, "title": "Lote 1", "code": "7001" },
        {
            "id": 2,
            "title": "Lote 2",
            "code": "7002",
            "createdAt": seven_months_ago.to_rfc3339(),
            "contractType": "6-months"
        },
        { "id": 3, "title": "Lote 3", "code": "7003" }
    ]);
    let mut store = store_with_blob(&blob.to_string());

    let report = store.load();

    assert_eq!(report.source, LoadSource::Persisted);
    assert_eq!(report.expired.len(), 1);
    assert_eq!(report.expired[0].id, 2);
    assert_eq!(report.active_count, 2);
    assert!(report.persisted);

    let ids: Vec<i64> = store.listings().iter().map(|listing| listing.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(persisted(&store).len(), 2);
    assert!(store.sink().notifications().iter().any(|note| {
        note.severity == Severity::Info && note.message.starts_with("1 expired listing")
    }));
}

#[test]
fn canonical_blob_without_expired_listings_is_not_rewritten() {
    let canonical = sanitize_all(&[json!({ "id": 1, "title": "Lote", "tags": ["a", "b"] })]);
    let blob = serde_json::to_string(&canonical).unwrap();
    let mut store = store_with_blob(&blob);

    let report = store.load();

    assert_eq!(report.source, LoadSource::Persisted);
    assert!(!report.persisted);
    assert_eq!(store.blob_store().peek(DEFAULT_STORAGE_KEY), Some(blob.as_str()));
    assert_eq!(store.listings(), canonical.as_slice());
}

#[test]
fn legacy_blob_is_rewritten_in_canonical_form() {
    let blob = r#"[{"id":1,"title":"Lote","tags":"a, b"}]"#;
    let mut store = store_with_blob(blob);

    let report = store.load();

    assert!(report.persisted);
    assert_eq!(store.listings()[0].tags, vec!["a", "b"]);
    assert_eq!(persisted(&store)[0]["tags"], json!(["a", "b"]));
}

#[test]
fn synthesized_ids_stay_stable_across_processes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("landListings.json"),
        r#"[{"title":"Legacy","code":"L1"}]"#,
    )
    .unwrap();
    let open = || {
        ListingStore::new(FileBlobStore::new(dir.path()), RecordingSink::new())
            .with_clock(FixedClock(now()))
    };

    let mut first = open();
    assert!(first.load().persisted);
    let id = first.find_by_code("L1").unwrap().id;
    drop(first);

    let mut second = open();
    let report = second.load();
    assert!(!report.persisted);
    assert_eq!(second.find_by_code("L1").unwrap().id, id);
    assert!(second.delete(id).unwrap());
    assert!(second.is_empty());
}

#[test]
fn first_load_writes_sanitized_seed() {
    let mut store = ListingStore::new(MemoryBlobStore::new(), RecordingSink::new())
        .with_clock(FixedClock(now()));

    let report = store.load();

    assert_eq!(report.source, LoadSource::Seed);
    assert!(report.persisted);
    assert_eq!(store.listings(), sanitize_all(&seed_records()).as_slice());
    assert_eq!(persisted(&store).len(), 3);
}

#[test]
fn seed_with_expired_listing_is_swept_before_first_write() {
    let seed = vec![
        json!({ "id": 1, "title": "Lote 1", "code": "7001" }),
        json!({
            "id": 2,
            "title": "Lote 2",
            "code": "7002",
            "createdAt": "2026-03-18T12:00:00Z",
            "contractType": "6-months"
        }),
        json!({ "id": 3, "title": "Lote 3", "code": "7003" }),
    ];
    let mut store = ListingStore::new(MemoryBlobStore::new(), RecordingSink::new())
        .with_clock(FixedClock(now()))
        .with_seed(seed);

    let report = store.load();

    assert_eq!(report.source, LoadSource::Seed);
    assert_eq!(report.expired.len(), 1);
    assert_eq!(report.expired[0].id, 2);
    assert!(report.persisted);
    let stored_ids: Vec<Value> = persisted(&store)
        .iter()
        .map(|record| record["id"].clone())
        .collect();
    assert_eq!(stored_ids, vec![json!(1), json!(3)]);
}

#[test]
fn huge_expiring_window_does_not_panic_on_load() {
    let config = EngineConfig {
        expiring_window_days: i64::MAX,
        ..EngineConfig::default()
    };
    let blob = json!([{ "id": 1, "expiresAt": "2100-01-01T00:00:00Z" }]).to_string();
    let mut store = ListingStore::with_config(
        config,
        MemoryBlobStore::with_blob(DEFAULT_STORAGE_KEY, blob),
        RecordingSink::new(),
    )
    .with_clock(FixedClock(now()));

    let report = store.load();

    assert_eq!(report.expiring_soon.map(|summary| summary.count), Some(1));
    assert_eq!(store.expiring_soon().len(), 1);
}

#[test]
fn malformed_blob_falls_back_to_seed_without_overwriting() {
    for blob in ["{not json", r#"{"id": 1}"#] {
        let mut store = store_with_blob(blob);

        let report = store.load();

        assert_eq!(report.source, LoadSource::SeedFallback);
        assert!(!report.persisted);
        assert_eq!(store.len(), 3);
        assert_eq!(store.blob_store().peek(DEFAULT_STORAGE_KEY), Some(blob));
        assert_eq!(
            store.sink().notifications()[0].severity,
            Severity::Warning
        );
    }
}

#[test]
fn load_reports_listings_expiring_soon() {
    let blob = json!([
        { "id": 1, "expiresAt": (now() + Duration::days(5)).to_rfc3339() },
        { "id": 2, "expiresAt": (now() + Duration::days(12)).to_rfc3339() },
        { "id": 3, "expiresAt": (now() + Duration::days(90)).to_rfc3339() }
    ]);
    let mut store = store_with_blob(&blob.to_string());

    let report = store.load();

    let summary = report.expiring_soon.expect("two listings expire soon");
    assert_eq!(summary.count, 2);
    assert_eq!(summary.earliest_days, 5);
    let soon: Vec<i64> = store.expiring_soon().iter().map(|listing| listing.id).collect();
    assert_eq!(soon, vec![1, 2]);
}

#[test]
fn add_assigns_fresh_id_and_stamps_contract() {
    let mut store = loaded_empty_store();

    let mut with_id = draft("Lote", "A1");
    with_id.id = 42;
    let added = store.add(with_id, Some(ContractType::OneYear)).unwrap();

    assert_ne!(added.id, 42);
    assert_eq!(added.created_at, Some(now()));
    assert_eq!(added.expires_at, Some(add_calendar_months(now(), 12)));
    assert_eq!(store.get(added.id), Some(&added));
    assert_eq!(persisted(&store).len(), 1);
    assert_eq!(store.sink().last().unwrap().severity, Severity::Success);
}

#[test]
fn add_without_contract_leaves_lifecycle_untracked() {
    let mut store = loaded_empty_store();

    let added = store.add(draft("Lote", ""), None).unwrap();

    assert_eq!(added.created_at, None);
    assert_eq!(added.expires_at, None);
    assert_eq!(added.contract_type, None);
}

#[test]
fn add_ignores_caller_supplied_lifecycle_fields() {
    let mut store = loaded_empty_store();
    let forged = Listing {
        contract_type: Some(ContractType::Indefinite),
        created_at: Some(now() - Duration::days(400)),
        expires_at: Some(now() - Duration::days(1)),
        ..draft("Forjado", "F1")
    };

    let added = store.add(forged, None).unwrap();

    assert_eq!(added.contract_type, Some(ContractType::Indefinite));
    assert_eq!(added.created_at, Some(now()));
    assert_eq!(added.expires_at, None);

    let untracked = Listing {
        expires_at: Some(now() + Duration::days(3)),
        ..draft("Solto", "F2")
    };
    let added = store.add(untracked, None).unwrap();
    assert_eq!(added.expires_at, None);
    assert_eq!(added.created_at, None);
}

#[test]
fn add_mirrors_cover_image_and_images() {
    let mut store = loaded_empty_store();

    let from_images = store
        .add(
            Listing {
                images: vec!["https://img/a.jpg".to_string(), String::new()],
                ..draft("Um", "I1")
            },
            None,
        )
        .unwrap();
    assert_eq!(from_images.images, vec!["https://img/a.jpg"]);
    assert_eq!(from_images.image_url, "https://img/a.jpg");

    let from_cover = store
        .add(
            Listing {
                image_url: "https://img/b.jpg".to_string(),
                ..draft("Dois", "I2")
            },
            None,
        )
        .unwrap();
    assert_eq!(from_cover.images, vec!["https://img/b.jpg"]);
}

#[test]
fn add_rejects_duplicate_code_ignoring_case_and_spaces() {
    let mut store = loaded_empty_store();
    store.add(draft("Primeiro", "A1"), None).unwrap();

    let err = store.add(draft("Segundo", "a1 "), None).unwrap_err();

    assert!(matches!(err, StoreError::DuplicateCode(code) if code == "a1"));
    assert_eq!(store.len(), 1);
    assert_eq!(persisted(&store).len(), 1);
    assert_eq!(store.sink().last().unwrap().severity, Severity::Error);
}

#[test]
fn blank_codes_are_exempt_from_uniqueness() {
    let mut store = loaded_empty_store();

    store.add(draft("Um", ""), None).unwrap();
    store.add(draft("Dois", "   "), None).unwrap();

    assert_eq!(store.len(), 2);
    let first = store.listings()[0].id;
    let second = store.listings()[1].id;
    assert_ne!(first, second);
}

#[test]
fn update_replaces_in_place_and_allows_own_code() {
    let mut store = loaded_empty_store();
    let first = store.add(draft("Um", "A1"), None).unwrap();
    let second = store.add(draft("Dois", "B2"), None).unwrap();

    let edited = Listing {
        title: "Um (editado)".to_string(),
        code: " a1".to_string(),
        ..first.clone()
    };
    store.update(edited).unwrap();

    assert_eq!(store.listings()[0].id, first.id);
    assert_eq!(store.listings()[0].title, "Um (editado)");
    assert_eq!(store.listings()[1].id, second.id);
    assert_eq!(persisted(&store)[0]["title"], json!("Um (editado)"));
}

#[test]
fn update_keeps_stored_lifecycle_unless_term_changes() {
    let mut store = loaded_empty_store();
    let added = store
        .add(draft("Um", "A1"), Some(ContractType::SixMonths))
        .unwrap();
    let id = added.id;
    let six_months = add_calendar_months(now(), 6);

    store
        .update(Listing {
            expires_at: Some(now() + Duration::days(3000)),
            created_at: None,
            ..added.clone()
        })
        .unwrap();
    let kept = store.get(id).unwrap();
    assert_eq!(kept.created_at, Some(now()));
    assert_eq!(kept.expires_at, Some(six_months));

    store
        .update(Listing {
            contract_type: Some(ContractType::OneYear),
            ..added.clone()
        })
        .unwrap();
    let restarted = store.get(id).unwrap();
    assert_eq!(restarted.contract_type, Some(ContractType::OneYear));
    assert_eq!(restarted.expires_at, Some(add_calendar_months(now(), 12)));

    store
        .update(Listing {
            contract_type: Some(ContractType::Indefinite),
            expires_at: Some(six_months),
            ..added
        })
        .unwrap();
    let open_ended = store.get(id).unwrap();
    assert_eq!(open_ended.contract_type, Some(ContractType::Indefinite));
    assert_eq!(open_ended.expires_at, None);
}

#[test]
fn update_rejects_code_owned_by_another_listing() {
    let mut store = loaded_empty_store();
    store.add(draft("Um", "A1"), None).unwrap();
    let second = store.add(draft("Dois", "B2"), None).unwrap();
    let before = store.listings().to_vec();

    let err = store
        .update(Listing {
            code: "A1".to_string(),
            ..second
        })
        .unwrap_err();

    assert!(matches!(err, StoreError::DuplicateCode(_)));
    assert_eq!(store.listings(), before.as_slice());
}

#[test]
fn update_of_unknown_id_is_not_found() {
    let mut store = loaded_empty_store();
    store.add(draft("Um", "A1"), None).unwrap();
    let before = store.listings().to_vec();

    let err = store
        .update(Listing {
            id: 999,
            ..draft("Fantasma", "Z9")
        })
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(999)));
    assert_eq!(store.listings(), before.as_slice());
}

#[test]
fn delete_removes_listing_and_tolerates_unknown_id() {
    let mut store = loaded_empty_store();
    let kept = store.add(draft("Um", "A1"), None).unwrap();
    let doomed = store.add(draft("Dois", "B2"), None).unwrap();

    assert!(store.delete(doomed.id).unwrap());
    assert!(!store.delete(doomed.id).unwrap());

    assert_eq!(store.len(), 1);
    assert_eq!(store.listings()[0].id, kept.id);
    assert_eq!(persisted(&store).len(), 1);
    assert!(store.find_by_code("b2").is_none());
}

#[test]
fn reset_restores_sanitized_seed() {
    let mut store = loaded_empty_store();
    store.add(draft("Um", "A1"), None).unwrap();

    store.reset().unwrap();

    let seed = sanitize_all(&seed_records());
    assert_eq!(store.listings(), seed.as_slice());
    assert_eq!(persisted(&store).len(), seed.len());
    assert!(store.find_by_code(" 7002 ").is_some());
}

#[test]
fn extend_moves_expiration_and_persists() {
    let mut store = loaded_empty_store();
    let added = store
        .add(draft("Um", "A1"), Some(ContractType::SixMonths))
        .unwrap();

    let extended = store.extend(added.id, 6).unwrap();

    assert_eq!(extended.expires_at, Some(add_calendar_months(now(), 12)));
    assert_eq!(store.get(added.id), Some(&extended));
    assert!(matches!(store.extend(12345, 6), Err(StoreError::NotFound(12345))));
}

#[test]
fn failed_write_leaves_memory_unchanged() {
    let blobs = ReadOnlyBlobs(MemoryBlobStore::with_blob(
        DEFAULT_STORAGE_KEY,
        r#"[{"id":1,"code":"A1"}]"#,
    ));
    let mut store = ListingStore::new(blobs, RecordingSink::new()).with_clock(FixedClock(now()));
    store.load();
    let before = store.listings().to_vec();

    let err = store.add(draft("Dois", "B2"), None).unwrap_err();
    assert!(matches!(err, StoreError::Storage(StorageError::Unavailable(_))));
    assert!(store.delete(1).is_err());
    assert!(store.reset().is_err());

    assert_eq!(store.listings(), before.as_slice());
    assert_eq!(store.sink().last().unwrap().severity, Severity::Error);
}

#[test]
fn custom_storage_key_and_file_backend_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        storage_key: "terrenos".to_string(),
        ..EngineConfig::default()
    };

    let mut first = ListingStore::with_config(
        config.clone(),
        FileBlobStore::new(dir.path()),
        RecordingSink::new(),
    )
    .with_clock(FixedClock(now()))
    .with_seed(Vec::new());
    first.load();
    let added = first
        .add(draft("Um", "A1"), Some(ContractType::OneYear))
        .unwrap();
    drop(first);

    assert!(dir.path().join("terrenos.json").exists());

    let mut second =
        ListingStore::with_config(config, FileBlobStore::new(dir.path()), RecordingSink::new())
            .with_clock(FixedClock(now()));
    let report = second.load();

    assert_eq!(report.source, LoadSource::Persisted);
    assert_eq!(second.listings(), std::slice::from_ref(&added));
}
