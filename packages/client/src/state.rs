//! Wiring of backends, local storage and screens.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::auth::AuthSession;
use crate::backend::{
    AccountService, DocumentStore, FirestoreClient, IdTokenSlot, IdentityClient, InMemoryAccounts,
    InMemoryDocumentStore,
};
use crate::config::Config;
use crate::error::ClientError;
use crate::listing::VocabularyFeed;
use crate::screens::{
    FavoritesScreen, HomeScreen, LoginScreen, Notices, ProfileScreen, SignupScreen,
};
use crate::storage::{FavoritesRepository, LocalStore, SettingsRepository, StatisticsRepository};

/// Shared services every screen is built from.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub session: Arc<AuthSession>,
    pub local: LocalStore,
    pub notices: Notices,
}

impl AppContext {
    /// Hosted backends and the on-disk store under `config.data_dir`.
    pub fn connect(config: Config) -> Result<Self, ClientError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let local = LocalStore::open(config.database_path())?;

        let id_token: IdTokenSlot = Arc::new(RwLock::new(None));
        let store: Arc<dyn DocumentStore> =
            Arc::new(FirestoreClient::new(&config, Arc::clone(&id_token))?);
        let accounts: Arc<dyn AccountService> =
            Arc::new(IdentityClient::new(&config, id_token)?);

        info!(
            project = %config.project_id,
            db_path = %local.db_path(),
            "client connected"
        );
        Ok(Self::with_parts(config, store, accounts, local))
    }

    /// In-process backends and an in-memory local store.
    pub fn in_memory(
        config: Config,
        store: Arc<InMemoryDocumentStore>,
        accounts: Arc<InMemoryAccounts>,
    ) -> Result<Self, ClientError> {
        Ok(Self::with_parts(config, store, accounts, LocalStore::in_memory()?))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        accounts: Arc<dyn AccountService>,
        local: LocalStore,
    ) -> Self {
        let session = Arc::new(AuthSession::new(accounts, Arc::clone(&store)));
        Self {
            config,
            store,
            session,
            local,
            notices: Notices::new(),
        }
    }

    pub fn favorites(&self) -> FavoritesRepository {
        FavoritesRepository::new(self.local.clone())
    }

    pub fn statistics(&self) -> StatisticsRepository {
        StatisticsRepository::new(self.local.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.local.clone())
    }

    pub fn login_screen(&self, just_registered: bool) -> LoginScreen {
        LoginScreen::new(Arc::clone(&self.session), just_registered)
    }

    pub fn signup_screen(&self) -> SignupScreen {
        SignupScreen::new(Arc::clone(&self.session))
    }

    pub fn home_screen(&self) -> HomeScreen {
        let feed = Arc::new(VocabularyFeed::new(
            Arc::clone(&self.store),
            self.config.page_size,
        ));
        HomeScreen::new(
            feed,
            self.favorites(),
            self.statistics(),
            self.notices.clone(),
            self.config.prefetch_threshold,
        )
    }

    pub fn favorites_screen(&self) -> FavoritesScreen {
        FavoritesScreen::new(self.favorites(), self.statistics())
    }

    pub fn profile_screen(&self) -> ProfileScreen {
        ProfileScreen::new(
            Arc::clone(&self.session),
            self.favorites(),
            self.statistics(),
            self.settings(),
        )
    }
}
