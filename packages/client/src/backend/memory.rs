//! In-process backends used by tests and local runs.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use crate::backend::{
    AccountService, BackendError, Document, DocumentStore, PageCursor, PageQuery, WriteBatch,
};
use crate::models::UserProfile;

// ============================================================
// Document store
// ============================================================

#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    next_query_error: Mutex<Option<BackendError>>,
    next_commit_error: Mutex<Option<BackendError>>,
    queries: AtomicUsize,
    commits: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: &str, document: Document) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document);
    }

    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, collection: &str, document_id: &str) -> Option<Document> {
        self.collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(document_id).cloned())
    }

    /// Makes the next `run_query` fail with `error`.
    pub fn fail_next_query(&self, error: BackendError) {
        *self.next_query_error.lock() = Some(error);
    }

    /// Makes the next `commit` fail with `error`.
    pub fn fail_next_commit(&self, error: BackendError) {
        *self.next_commit_error.lock() = Some(error);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(AtomicOrdering::SeqCst)
    }
}

fn is_after(doc: &Document, order_by: &str, cursor: &PageCursor) -> bool {
    let Some(key) = doc.get(order_by) else {
        return false;
    };
    match key.compare(&cursor.key) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => doc.id > cursor.document_id,
        _ => false,
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn run_query(&self, query: &PageQuery) -> Result<Vec<Document>, BackendError> {
        self.queries.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(error) = self.next_query_error.lock().take() {
            return Err(error);
        }

        let collections = self.collections.read();
        // Documents without the ordering field are excluded, as Firestore does.
        let mut docs: Vec<&Document> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| doc.get(&query.order_by).is_some())
                    .collect()
            })
            .unwrap_or_default();

        docs.sort_by(|a, b| {
            let ka = a.get(&query.order_by);
            let kb = b.get(&query.order_by);
            let by_key = match (ka, kb) {
                (Some(ka), Some(kb)) => ka.compare(kb).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            by_key.then_with(|| a.id.cmp(&b.id))
        });

        Ok(docs
            .into_iter()
            .filter(|doc| match &query.start_after {
                Some(cursor) => is_after(doc, &query.order_by, cursor),
                None => true,
            })
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), BackendError> {
        if let Some(error) = self.next_commit_error.lock().take() {
            return Err(error);
        }
        batch.check_size()?;

        let mut collections = self.collections.write();
        for write in batch.into_writes() {
            collections.entry(write.collection).or_default().insert(
                write.document_id.clone(),
                Document {
                    id: write.document_id,
                    fields: write.fields,
                },
            );
        }
        self.commits.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

// ============================================================
// Accounts
// ============================================================

struct StoredAccount {
    password: String,
    disabled: bool,
    profile: UserProfile,
}

/// Email/password accounts kept in memory, reporting the same error codes
/// as the hosted account system.
#[derive(Default)]
pub struct InMemoryAccounts {
    accounts: Mutex<HashMap<String, StoredAccount>>,
    current: RwLock<Option<UserProfile>>,
    next_error: Mutex<Option<BackendError>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account directly, bypassing validation.
    pub fn add_account(&self, email: &str, password: &str, display_name: Option<&str>) -> UserProfile {
        let profile = UserProfile {
            uid: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.map(str::to_string),
            email: Some(email.to_string()),
            created_at: Some(Utc::now()),
        };
        self.accounts.lock().insert(
            email.to_lowercase(),
            StoredAccount {
                password: password.to_string(),
                disabled: false,
                profile: profile.clone(),
            },
        );
        profile
    }

    pub fn disable(&self, email: &str) {
        if let Some(account) = self.accounts.lock().get_mut(&email.to_lowercase()) {
            account.disabled = true;
        }
    }

    /// Makes the next account call fail with `error`.
    pub fn fail_next(&self, error: BackendError) {
        *self.next_error.lock() = Some(error);
    }

    fn injected_error(&self) -> Result<(), BackendError> {
        match self.next_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AccountService for InMemoryAccounts {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile, BackendError> {
        self.injected_error()?;

        let accounts = self.accounts.lock();
        let account = accounts
            .get(&email.to_lowercase())
            .ok_or_else(|| BackendError::new("auth/user-not-found", "EMAIL_NOT_FOUND"))?;
        if account.disabled {
            return Err(BackendError::new("auth/user-disabled", "USER_DISABLED"));
        }
        if account.password != password {
            return Err(BackendError::new("auth/wrong-password", "INVALID_PASSWORD"));
        }

        let profile = account.profile.clone();
        *self.current.write() = Some(profile.clone());
        Ok(profile)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<UserProfile, BackendError> {
        self.injected_error()?;

        if self.accounts.lock().contains_key(&email.to_lowercase()) {
            return Err(BackendError::new("auth/email-already-in-use", "EMAIL_EXISTS"));
        }
        if password.chars().count() < 6 {
            return Err(BackendError::new(
                "auth/weak-password",
                "WEAK_PASSWORD : Password should be at least 6 characters",
            ));
        }

        let profile = self.add_account(email, password, None);
        *self.current.write() = Some(profile.clone());
        Ok(profile)
    }

    async fn update_display_name(&self, display_name: &str) -> Result<UserProfile, BackendError> {
        self.injected_error()?;

        let mut current = self.current.write();
        let profile = current
            .as_mut()
            .ok_or_else(|| BackendError::new("auth/no-current-user", "no signed-in account"))?;
        profile.display_name = Some(display_name.to_string());

        let mut accounts = self.accounts.lock();
        if let Some(account) = accounts
            .values_mut()
            .find(|account| account.profile.uid == profile.uid)
        {
            account.profile.display_name = profile.display_name.clone();
        }

        Ok(profile.clone())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.injected_error()?;
        *self.current.write() = None;
        Ok(())
    }

    fn current_user(&self) -> Option<UserProfile> {
        self.current.read().clone()
    }
}
