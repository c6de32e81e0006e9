use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthSession, AuthState, AuthSubscription};
use crate::error::Alert;
use crate::models::{format_member_since, Setting, UserProfile, UserSettings, UserStatistics};
use crate::screens::Route;
use crate::storage::{FavoritesRepository, SettingsRepository, StatisticsRepository};

pub const RESET_DONE_MESSAGE: &str = "Your progress has been reset.";
pub const RESET_FAILED_MESSAGE: &str = "Failed to reset progress.";
pub const CLEAR_DONE_MESSAGE: &str = "All favorites have been cleared.";
pub const CLEAR_FAILED_MESSAGE: &str = "Failed to clear favorites.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    /// Waiting for the first account-state notification.
    Loading,
    Ready,
    /// No signed-in account; the screen has asked to go to login.
    SignedOut,
}

/// Account details, statistics and settings of the signed-in user.
///
/// Follows the account state while mounted: a sign-out anywhere turns into
/// a redirect to login.
pub struct ProfileScreen {
    session: Arc<AuthSession>,
    favorites: FavoritesRepository,
    statistics: StatisticsRepository,
    settings_repo: SettingsRepository,
    events: Option<mpsc::UnboundedReceiver<AuthState>>,
    subscription: Option<AuthSubscription>,
    status: ProfileStatus,
    user: Option<UserProfile>,
    stats: UserStatistics,
    settings: UserSettings,
}

impl ProfileScreen {
    pub fn new(
        session: Arc<AuthSession>,
        favorites: FavoritesRepository,
        statistics: StatisticsRepository,
        settings: SettingsRepository,
    ) -> Self {
        Self {
            session,
            favorites,
            statistics,
            settings_repo: settings,
            events: None,
            subscription: None,
            status: ProfileStatus::Loading,
            user: None,
            stats: UserStatistics::default(),
            settings: UserSettings::default(),
        }
    }

    /// Starts observing the account state. Mounting twice is a no-op.
    pub fn mount(&mut self) {
        if self.subscription.is_some() {
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.session.subscribe(move |state| {
            // The receiver is gone once the screen is dropped.
            let _ = tx.send(state.clone());
        });

        self.events = Some(rx);
        self.subscription = Some(subscription);
        self.status = ProfileStatus::Loading;
    }

    /// Stops observing. Safe to call when not mounted.
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.events = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Applies queued account-state changes. Returns the redirect when the
    /// account is signed out.
    pub fn process_events(&mut self) -> Option<Route> {
        let mut route = None;
        while let Some(state) = self.events.as_mut().and_then(|rx| rx.try_recv().ok()) {
            route = self.apply(state).or(route);
        }
        route
    }

    /// Waits for the next account-state change, then applies everything
    /// queued.
    pub async fn wait_for_auth(&mut self) -> Option<Route> {
        let state = match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => return None,
        }?;
        let route = self.apply(state);
        self.process_events().or(route)
    }

    fn apply(&mut self, state: AuthState) -> Option<Route> {
        match state {
            AuthState::SignedIn(user) => {
                debug!(uid = %user.uid, "profile: signed in");
                self.load_user_data(user, Utc::now());
                None
            }
            AuthState::SignedOut => {
                debug!("profile: signed out, redirecting");
                self.user = None;
                self.status = ProfileStatus::SignedOut;
                Some(Route::Login {
                    just_registered: false,
                })
            }
        }
    }

    fn load_user_data(&mut self, user: UserProfile, now: DateTime<Utc>) {
        let favorite_count = u32::try_from(self.favorites.load_or_empty().len()).unwrap_or(u32::MAX);

        self.stats = match self
            .statistics
            .load_or_init(favorite_count, user.created_at, now)
        {
            Ok(stats) => stats,
            Err(err) => {
                error!(error = %err, "failed to load statistics");
                UserStatistics::initial(favorite_count, user.created_at, now)
            }
        };
        self.settings = self.settings_repo.load();
        self.user = Some(user);
        self.status = ProfileStatus::Ready;
    }

    pub fn status(&self) -> ProfileStatus {
        self.status
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .map(UserProfile::display_name_or_default)
            .unwrap_or("User")
    }

    pub fn email(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|user| user.email.as_deref())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> &UserStatistics {
        &self.stats
    }

    pub fn settings(&self) -> UserSettings {
        self.settings
    }

    pub fn member_since(&self) -> String {
        format_member_since(self.stats.join_date)
    }

    pub fn days_active(&self, now: DateTime<Utc>) -> i64 {
        self.stats.days_active(now)
    }

    /// Flips one settings switch; on a storage failure the old value stays.
    pub fn set_setting(&mut self, setting: Setting, value: bool) -> UserSettings {
        match self.settings_repo.set(setting, value) {
            Ok(settings) => self.settings = settings,
            Err(err) => error!(?setting, error = %err, "failed to save settings"),
        }
        self.settings
    }

    /// Resets counters, keeping the favorite count and join date.
    pub fn reset_progress(&mut self) -> Result<Alert, Alert> {
        match self.statistics.reset(Utc::now()) {
            Ok(stats) => {
                info!("progress reset");
                self.stats = stats;
                Ok(Alert::success(RESET_DONE_MESSAGE))
            }
            Err(err) => {
                error!(error = %err, "failed to reset progress");
                Err(Alert::error(RESET_FAILED_MESSAGE))
            }
        }
    }

    pub fn clear_favorites(&mut self) -> Result<Alert, Alert> {
        let cleared = self.favorites.clear().and_then(|_| {
            let mut stats = self.stats.clone();
            stats.favorite_words = 0;
            self.statistics.save(&stats).map(|_| stats)
        });

        match cleared {
            Ok(stats) => {
                info!("favorites cleared");
                self.stats = stats;
                Ok(Alert::success(CLEAR_DONE_MESSAGE))
            }
            Err(err) => {
                error!(error = %err, "failed to clear favorites");
                Err(Alert::error(CLEAR_FAILED_MESSAGE))
            }
        }
    }

    /// Signs out. The redirect comes through the account-state observer.
    pub async fn sign_out(&mut self) -> Result<Option<Route>, Alert> {
        self.session.sign_out().await?;
        if !self.is_mounted() {
            warn!("signed out while profile is not mounted");
        }
        Ok(self.process_events())
    }

    pub fn open_favorites(&self) -> Route {
        Route::Favorites
    }

    pub fn back(&self) -> Route {
        Route::Back
    }
}

impl Drop for ProfileScreen {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LoginForm;
    use crate::backend::{BackendError, InMemoryAccounts, InMemoryDocumentStore};
    use crate::models::VocabularyEntry;
    use crate::storage::LocalStore;

    struct Fixture {
        session: Arc<AuthSession>,
        accounts: Arc<InMemoryAccounts>,
        local: LocalStore,
    }

    impl Fixture {
        fn new() -> Self {
            let accounts = Arc::new(InMemoryAccounts::new());
            let session = Arc::new(AuthSession::new(
                accounts.clone(),
                Arc::new(InMemoryDocumentStore::new()),
            ));
            Self {
                session,
                accounts,
                local: LocalStore::in_memory().unwrap(),
            }
        }

        async fn signed_in(self) -> Self {
            self.accounts
                .add_account("reader@example.com", "secret1", Some("reader"));
            self.session
                .sign_in(&LoginForm::new("reader@example.com", "secret1"))
                .await
                .unwrap();
            self
        }

        fn screen(&self) -> ProfileScreen {
            ProfileScreen::new(
                self.session.clone(),
                FavoritesRepository::new(self.local.clone()),
                StatisticsRepository::new(self.local.clone()),
                SettingsRepository::new(self.local.clone()),
            )
        }
    }

    #[tokio::test]
    async fn signed_out_user_is_redirected() {
        let fixture = Fixture::new();
        let mut screen = fixture.screen();
        screen.mount();

        let route = screen.wait_for_auth().await;
        assert_eq!(route, Some(Route::Login { just_registered: false }));
        assert_eq!(screen.status(), ProfileStatus::SignedOut);
    }

    #[tokio::test]
    async fn signed_in_user_gets_initialized_stats() {
        let fixture = Fixture::new().signed_in().await;
        FavoritesRepository::new(fixture.local.clone())
            .toggle(&VocabularyEntry::new("a"))
            .unwrap();

        let mut screen = fixture.screen();
        screen.mount();
        assert_eq!(screen.wait_for_auth().await, None);

        assert_eq!(screen.status(), ProfileStatus::Ready);
        assert_eq!(screen.display_name(), "reader");
        assert_eq!(screen.email(), "reader@example.com");
        assert_eq!(screen.stats().favorite_words, 1);
        assert_eq!(screen.stats().daily_streak, 1);
        assert_ne!(screen.member_since(), "Unknown");
        assert_eq!(screen.settings(), UserSettings::default());
    }

    #[tokio::test]
    async fn actions_persist_and_report() {
        let fixture = Fixture::new().signed_in().await;
        let favorites = FavoritesRepository::new(fixture.local.clone());
        favorites.toggle(&VocabularyEntry::new("a")).unwrap();
        favorites.toggle(&VocabularyEntry::new("b")).unwrap();

        let mut screen = fixture.screen();
        screen.mount();
        screen.wait_for_auth().await;

        let settings = screen.set_setting(Setting::SoundEffects, true);
        assert!(settings.sound_effects);
        assert!(SettingsRepository::new(fixture.local.clone()).load().sound_effects);

        assert_eq!(screen.reset_progress().unwrap(), Alert::success(RESET_DONE_MESSAGE));
        assert_eq!(screen.stats().favorite_words, 2);

        assert_eq!(screen.clear_favorites().unwrap(), Alert::success(CLEAR_DONE_MESSAGE));
        assert_eq!(screen.stats().favorite_words, 0);
        assert!(favorites.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sign_out_redirects_through_observer() {
        let fixture = Fixture::new().signed_in().await;
        let mut screen = fixture.screen();
        screen.mount();
        screen.wait_for_auth().await;

        fixture.accounts.fail_next(BackendError::unavailable("offline"));
        let alert = screen.sign_out().await.unwrap_err();
        assert_eq!(alert.message, "Failed to sign out. Please try again.");
        assert_eq!(screen.status(), ProfileStatus::Ready);

        let route = screen.sign_out().await.unwrap();
        assert_eq!(route, Some(Route::Login { just_registered: false }));
        assert_eq!(screen.status(), ProfileStatus::SignedOut);
    }

    #[tokio::test]
    async fn unmount_releases_observer() {
        let fixture = Fixture::new();
        {
            let mut screen = fixture.screen();
            screen.mount();
            screen.mount();
            assert_eq!(fixture.session.observer_count(), 1);
            screen.unmount();
            assert_eq!(fixture.session.observer_count(), 0);
            screen.mount();
        }
        assert_eq!(fixture.session.observer_count(), 0);
    }
}
