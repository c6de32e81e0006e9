use chrono::{TimeZone, Utc};

use lexideck_client::backend::{
    BackendError, DocumentStore, FieldValue, InMemoryDocumentStore, MAX_BATCH_WRITES,
    VOCABULARY_COLLECTION,
};
use lexideck_seed::{load_vocabulary, parse_vocabulary, upload, SeedError, SeedWord};

fn words(n: usize) -> Vec<SeedWord> {
    (0..n)
        .map(|i| SeedWord {
            word: format!("word{i:04}"),
            adjective: None,
            noun: None,
            example: None,
            synonyms: vec![],
        })
        .collect()
}

#[tokio::test]
async fn duplicate_words_are_uploaded_once() {
    let store = InMemoryDocumentStore::new();
    let list = parse_vocabulary(
        r#"[{"word":"a","example":"first"},{"word":"b"},{"word":"a","example":"second"}]"#,
    )
    .unwrap();
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    let report = upload(&store, list, MAX_BATCH_WRITES, now).await.unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.uploaded, vec!["a", "b"]);
    assert_eq!(report.batches, 1);

    let a = store.get(VOCABULARY_COLLECTION, "a").unwrap();
    assert_eq!(a.get_str("example"), Some("first"));
    assert_eq!(a.get("createdAt"), Some(&FieldValue::TimestampValue(now)));
}

#[tokio::test]
async fn large_lists_are_split_into_batches_of_500() {
    let store = InMemoryDocumentStore::new();
    let report = upload(&store, words(1_001), MAX_BATCH_WRITES, Utc::now())
        .await
        .unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(store.commit_count(), 3);
    assert_eq!(store.documents(VOCABULARY_COLLECTION).len(), 1_001);
}

#[tokio::test]
async fn oversized_batch_request_is_capped() {
    let store = InMemoryDocumentStore::new();
    let report = upload(&store, words(600), 10_000, Utc::now()).await.unwrap();
    assert_eq!(report.batches, 2);
}

#[tokio::test]
async fn commit_failure_stops_the_upload() {
    let store = InMemoryDocumentStore::new();
    store.fail_next_commit(BackendError::new("permission-denied", "denied"));

    let err = upload(&store, words(3), 2, Utc::now()).await.unwrap_err();
    assert!(matches!(err, SeedError::Upload { batch: 1, .. }));
    assert!(store.documents(VOCABULARY_COLLECTION).is_empty());
}

#[tokio::test]
async fn bundled_list_seeds_the_store() {
    let store = InMemoryDocumentStore::new();
    let list = load_vocabulary().unwrap();
    let count = list.len();

    let report = upload(&store, list, MAX_BATCH_WRITES, Utc::now()).await.unwrap();
    assert_eq!(report.uploaded.len(), count);

    let page = store
        .run_query(&lexideck_client::backend::PageQuery::first(
            VOCABULARY_COLLECTION,
            "word",
            5,
        ))
        .await
        .unwrap();
    assert_eq!(page.len(), 5);
}
