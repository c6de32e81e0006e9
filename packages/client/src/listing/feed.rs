//! Cursor-paginated vocabulary list.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::backend::{
    BackendError, DocumentStore, PageCursor, PageQuery, VOCABULARY_COLLECTION, WORD_FIELD,
};
use crate::models::VocabularyEntry;

/// Result of a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page arrived; `appended` new entries were added.
    Loaded { appended: usize, exhausted: bool },
    /// Skipped without a backend call: another fetch is running or the
    /// previous page was short.
    Suppressed,
}

#[derive(Default)]
struct FeedState {
    entries: Vec<VocabularyEntry>,
    ids: HashSet<String>,
    cursor: Option<PageCursor>,
    exhausted: bool,
    loading: bool,
}

/// Accumulated pages of the `vocabulary` collection ordered by word.
///
/// Shared between the screen and its background prefetch task; all state is
/// behind one lock that is never held across an await.
pub struct VocabularyFeed {
    store: Arc<dyn DocumentStore>,
    page_size: usize,
    state: Mutex<FeedState>,
}

/// Clears the in-flight flag when the fetch finishes, fails or is dropped.
struct LoadingGuard<'a> {
    state: &'a Mutex<FeedState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().loading = false;
    }
}

impl VocabularyFeed {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            state: Mutex::new(FeedState::default()),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<VocabularyEntry> {
        self.state.lock().entries.get(index).cloned()
    }

    pub fn entries(&self) -> Vec<VocabularyEntry> {
        self.state.lock().entries.clone()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.lock().exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Drops everything loaded so far and fetches the first page.
    pub async fn load_first(&self) -> Result<FetchOutcome, BackendError> {
        {
            let mut state = self.state.lock();
            if state.loading {
                return Ok(FetchOutcome::Suppressed);
            }
            *state = FeedState::default();
        }
        self.fetch_next().await
    }

    /// Fetches the page after the last received document.
    ///
    /// On failure the loaded entries and the cursor are left untouched, so
    /// the same page is requested again next time.
    pub async fn fetch_next(&self) -> Result<FetchOutcome, BackendError> {
        let query = {
            let mut state = self.state.lock();
            if state.loading || state.exhausted {
                debug!(
                    loading = state.loading,
                    exhausted = state.exhausted,
                    "page fetch suppressed"
                );
                return Ok(FetchOutcome::Suppressed);
            }
            state.loading = true;

            let query = PageQuery::first(VOCABULARY_COLLECTION, WORD_FIELD, self.page_size);
            match state.cursor.clone() {
                Some(cursor) => query.after(cursor),
                None => query,
            }
        };
        let _guard = LoadingGuard { state: &self.state };

        let documents = match self.store.run_query(&query).await {
            Ok(documents) => documents,
            Err(err) => {
                warn!(code = %err.code, error = %err.message, "failed to fetch vocabulary page");
                return Err(err);
            }
        };

        let mut state = self.state.lock();
        let received = documents.len();
        let mut appended = 0;

        for doc in &documents {
            if state.ids.insert(doc.id.clone()) {
                state.entries.push(VocabularyEntry::from_document(doc));
                appended += 1;
            } else {
                debug!(id = %doc.id, "duplicate entry dropped");
            }
        }

        if let Some(cursor) = documents
            .last()
            .and_then(|doc| PageCursor::after(doc, WORD_FIELD))
        {
            state.cursor = Some(cursor);
        }
        state.exhausted = received < self.page_size;

        debug!(
            received,
            appended,
            total = state.entries.len(),
            exhausted = state.exhausted,
            "vocabulary page loaded"
        );

        Ok(FetchOutcome::Loaded {
            appended,
            exhausted: state.exhausted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Document, FieldValue, InMemoryDocumentStore};

    fn seeded(words: &[&str]) -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        for word in words {
            store.insert(
                VOCABULARY_COLLECTION,
                Document::new(*word).with_field(WORD_FIELD, FieldValue::string(*word)),
            );
        }
        store
    }

    fn words(feed: &VocabularyFeed) -> Vec<String> {
        feed.entries().into_iter().map(|e| e.word).collect()
    }

    /// Parks every query until `release` is notified.
    struct GatedStore {
        inner: Arc<InMemoryDocumentStore>,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl DocumentStore for GatedStore {
        async fn run_query(&self, query: &PageQuery) -> Result<Vec<Document>, BackendError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.run_query(query).await
        }

        async fn commit(&self, batch: crate::backend::WriteBatch) -> Result<(), BackendError> {
            self.inner.commit(batch).await
        }
    }

    #[tokio::test]
    async fn second_request_while_fetching_is_suppressed() {
        let inner = seeded(&["a", "b", "c"]);
        let gate = Arc::new(GatedStore {
            inner: inner.clone(),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let feed = Arc::new(VocabularyFeed::new(gate.clone(), 2));

        let running = tokio::spawn({
            let feed = Arc::clone(&feed);
            async move { feed.load_first().await }
        });
        gate.entered.notified().await;
        assert!(feed.is_loading());

        assert_eq!(feed.fetch_next().await.unwrap(), FetchOutcome::Suppressed);
        assert_eq!(feed.load_first().await.unwrap(), FetchOutcome::Suppressed);

        gate.release.notify_one();
        let first = running.await.unwrap().unwrap();
        assert_eq!(first, FetchOutcome::Loaded { appended: 2, exhausted: false });
        assert!(!feed.is_loading());
        assert_eq!(inner.query_count(), 1);
        assert_eq!(words(&feed), ["a", "b"]);
    }

    #[tokio::test]
    async fn pages_concatenate_in_order_until_short_page() {
        let store = seeded(&["e", "a", "d", "b", "c"]);
        let feed = VocabularyFeed::new(store.clone(), 2);

        feed.load_first().await.unwrap();
        feed.fetch_next().await.unwrap();
        let last = feed.fetch_next().await.unwrap();
        assert_eq!(last, FetchOutcome::Loaded { appended: 1, exhausted: true });
        assert_eq!(words(&feed), ["a", "b", "c", "d", "e"]);

        assert_eq!(feed.fetch_next().await.unwrap(), FetchOutcome::Suppressed);
        assert_eq!(store.query_count(), 3);
    }

    #[tokio::test]
    async fn full_final_page_needs_one_empty_fetch() {
        let store = seeded(&["a", "b"]);
        let feed = VocabularyFeed::new(store.clone(), 2);

        let first = feed.load_first().await.unwrap();
        assert_eq!(first, FetchOutcome::Loaded { appended: 2, exhausted: false });
        let second = feed.fetch_next().await.unwrap();
        assert_eq!(second, FetchOutcome::Loaded { appended: 0, exhausted: true });
        assert_eq!(feed.len(), 2);
    }

    #[tokio::test]
    async fn failure_keeps_loaded_entries_and_cursor() {
        let store = seeded(&["a", "b", "c"]);
        let feed = VocabularyFeed::new(store.clone(), 2);
        feed.load_first().await.unwrap();

        store.fail_next_query(BackendError::unavailable("offline"));
        assert!(feed.fetch_next().await.is_err());
        assert_eq!(words(&feed), ["a", "b"]);
        assert!(!feed.is_loading());

        feed.fetch_next().await.unwrap();
        assert_eq!(words(&feed), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn already_loaded_ids_are_not_appended_again() {
        let store = seeded(&["a", "b"]);
        let feed = VocabularyFeed::new(store.clone(), 2);
        feed.load_first().await.unwrap();

        // Same id, later key: would be returned after the cursor.
        store.insert(
            VOCABULARY_COLLECTION,
            Document::new("a").with_field(WORD_FIELD, FieldValue::string("z")),
        );
        let outcome = feed.fetch_next().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Loaded { appended: 0, exhausted: true });
        assert_eq!(feed.len(), 2);
    }

    #[tokio::test]
    async fn empty_collection_is_exhausted_immediately() {
        let feed = VocabularyFeed::new(seeded(&[]), 20);
        let outcome = feed.load_first().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Loaded { appended: 0, exhausted: true });
        assert!(feed.is_empty());
        assert!(feed.is_exhausted());
    }
}
