//! Account session: sign-in/sign-up/sign-out plus account-state observers.

pub mod messages;
pub mod validation;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::backend::{
    AccountService, BackendError, DocumentStore, FieldValue, MapValue, WriteBatch,
    USERS_COLLECTION,
};
use crate::error::Alert;
use crate::models::{UserProfile, UserRecord};

pub use validation::{LoginForm, SignupForm, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    SignedIn(UserProfile),
    SignedOut,
}

impl AuthState {
    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            AuthState::SignedIn(user) => Some(user),
            AuthState::SignedOut => None,
        }
    }
}

type Observer = Arc<dyn Fn(&AuthState) + Send + Sync>;

#[derive(Default)]
struct ObserverRegistry {
    observers: RwLock<HashMap<String, Observer>>,
}

impl ObserverRegistry {
    fn remove(&self, id: &str) {
        if self.observers.write().remove(id).is_some() {
            debug!(subscriber_id = %id, "auth observer removed");
        }
    }

    fn snapshot(&self) -> Vec<Observer> {
        self.observers.read().values().cloned().collect()
    }
}

/// Handle of a registered account-state observer.
///
/// `unsubscribe` (or dropping the handle) is the only way to remove the
/// observer, and it is idempotent.
pub struct AuthSubscription {
    id: Option<String>,
    registry: Weak<ObserverRegistry>,
}

impl AuthSubscription {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(registry) = self.registry.upgrade() {
                registry.remove(&id);
            }
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct AuthSession {
    accounts: Arc<dyn AccountService>,
    store: Arc<dyn DocumentStore>,
    observers: Arc<ObserverRegistry>,
}

impl AuthSession {
    pub fn new(accounts: Arc<dyn AccountService>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            accounts,
            store,
            observers: Arc::new(ObserverRegistry::default()),
        }
    }

    pub fn current_state(&self) -> AuthState {
        match self.accounts.current_user() {
            Some(user) => AuthState::SignedIn(user),
            None => AuthState::SignedOut,
        }
    }

    /// Registers `observer`; it is called right away with the current state
    /// and again after every sign-in, sign-up and sign-out.
    pub fn subscribe<F>(&self, observer: F) -> AuthSubscription
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        let id = uuid::Uuid::new_v4().to_string();
        let observer: Observer = Arc::new(observer);
        self.observers
            .observers
            .write()
            .insert(id.clone(), Arc::clone(&observer));
        debug!(subscriber_id = %id, "auth observer registered");

        observer(&self.current_state());

        AuthSubscription {
            id: Some(id),
            registry: Arc::downgrade(&self.observers),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.observers.read().len()
    }

    fn notify(&self, state: &AuthState) {
        // Observers run outside the lock so they may unsubscribe themselves.
        for observer in self.observers.snapshot() {
            observer(state);
        }
    }

    pub async fn sign_in(&self, form: &LoginForm) -> Result<UserProfile, Alert> {
        form.validate()?;

        match self.accounts.sign_in(&form.email, &form.password).await {
            Ok(user) => {
                info!(uid = %user.uid, "user signed in");
                self.notify(&AuthState::SignedIn(user.clone()));
                Ok(user)
            }
            Err(err) => {
                warn!(code = %err.code, error = %err.message, "sign-in failed");
                Err(messages::login_failure(&err))
            }
        }
    }

    /// Creates the account, sets its display name and stores the
    /// `users/{uid}` record.
    pub async fn sign_up(&self, form: &SignupForm) -> Result<UserProfile, Alert> {
        form.validate()?;

        let user = self.create_account(form).await.map_err(|err| {
            warn!(code = %err.code, error = %err.message, "sign-up failed");
            messages::signup_failure(&err)
        })?;

        info!(uid = %user.uid, username = %form.username.trim(), "user account created");
        self.notify(&AuthState::SignedIn(user.clone()));
        Ok(user)
    }

    async fn create_account(&self, form: &SignupForm) -> Result<UserProfile, BackendError> {
        self.accounts.sign_up(&form.email, &form.password).await?;
        let user = self.accounts.update_display_name(&form.username).await?;

        let record = UserRecord::for_new_account(&user.uid, &form.username, &form.email, Utc::now());
        let mut batch = WriteBatch::new();
        batch.set(USERS_COLLECTION, &record.uid, user_record_fields(&record));
        self.store.commit(batch).await?;

        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), Alert> {
        if let Err(err) = self.accounts.sign_out().await {
            warn!(code = %err.code, error = %err.message, "sign-out failed");
            return Err(Alert::error("Failed to sign out. Please try again."));
        }
        info!("user signed out");
        self.notify(&AuthState::SignedOut);
        Ok(())
    }
}

fn user_record_fields(record: &UserRecord) -> BTreeMap<String, FieldValue> {
    let progress = &record.vocab_progress;
    let vocab_progress = MapValue {
        fields: BTreeMap::from([
            ("totalWords".to_string(), FieldValue::integer(progress.total_words.into())),
            ("masteredWords".to_string(), FieldValue::integer(progress.mastered_words.into())),
            ("streak".to_string(), FieldValue::integer(progress.streak.into())),
        ]),
    };

    BTreeMap::from([
        ("uid".to_string(), FieldValue::string(&record.uid)),
        ("username".to_string(), FieldValue::string(&record.username)),
        ("email".to_string(), FieldValue::string(&record.email)),
        ("displayName".to_string(), FieldValue::string(&record.display_name)),
        ("createdAt".to_string(), FieldValue::string(record.created_at.to_rfc3339())),
        ("updatedAt".to_string(), FieldValue::string(record.updated_at.to_rfc3339())),
        ("profileComplete".to_string(), FieldValue::BooleanValue(record.profile_complete)),
        ("vocabProgress".to_string(), FieldValue::MapValue(vocab_progress)),
    ])
}
