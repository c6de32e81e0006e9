use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::Alert;
use crate::listing::{CardNavigator, VocabularyFeed};
use crate::models::VocabularyEntry;
use crate::presentation::WordCard;
use crate::screens::{Notices, Route};
use crate::storage::{FavoritesRepository, StatisticsRepository, ToggleOutcome};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load vocabulary data";
pub const FAVORITE_SAVE_FAILED_MESSAGE: &str = "Failed to update favorites.";

/// One card at a time over the accumulated vocabulary pages.
pub struct HomeScreen {
    feed: Arc<VocabularyFeed>,
    navigator: CardNavigator,
    favorites: FavoritesRepository,
    statistics: StatisticsRepository,
    favorite_ids: HashSet<String>,
    notices: Notices,
    prefetch_threshold: usize,
    pending_fetch: Option<JoinHandle<()>>,
    loading: bool,
}

impl HomeScreen {
    pub fn new(
        feed: Arc<VocabularyFeed>,
        favorites: FavoritesRepository,
        statistics: StatisticsRepository,
        notices: Notices,
        prefetch_threshold: usize,
    ) -> Self {
        Self {
            feed,
            navigator: CardNavigator::new(),
            favorites,
            statistics,
            favorite_ids: HashSet::new(),
            notices,
            prefetch_threshold,
            pending_fetch: None,
            loading: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Initial load: favorites from local storage and the first page.
    pub async fn load(&mut self) {
        self.loading = true;
        self.reload_favorites();

        if let Err(err) = self.feed.load_first().await {
            error!(code = %err.code, error = %err.message, "initial vocabulary load failed");
            self.notices.push(Alert::error(LOAD_FAILED_MESSAGE));
        }

        self.navigator.reset();
        self.loading = false;
        self.record_view();
    }

    /// Re-reads favorites, e.g. when the screen regains focus.
    pub fn reload_favorites(&mut self) {
        self.favorite_ids = self
            .favorites
            .load_or_empty()
            .iter()
            .map(|f| f.id().to_string())
            .collect();
    }

    pub fn len(&self) -> usize {
        self.feed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feed.is_empty()
    }

    pub fn index(&self) -> usize {
        self.navigator.index()
    }

    pub fn current(&self) -> Option<VocabularyEntry> {
        self.feed.get(self.navigator.index())
    }

    pub fn card(&self) -> Option<WordCard> {
        self.current()
            .map(|entry| WordCard::new(&entry, self.favorite_ids.contains(&entry.id)))
    }

    /// Advances one card, wrapping to the first. Close to the end of the
    /// loaded list the next page is fetched in the background.
    pub fn next(&mut self) -> usize {
        let len = self.feed.len();
        if self.navigator.near_end(len, self.prefetch_threshold) {
            self.spawn_prefetch();
        }
        self.navigator.next(len);
        self.record_view();
        self.navigator.index()
    }

    pub fn previous(&mut self) -> usize {
        self.navigator.previous(self.feed.len());
        self.record_view();
        self.navigator.index()
    }

    pub fn is_current_favorited(&self) -> bool {
        self.current()
            .map(|entry| self.favorite_ids.contains(&entry.id))
            .unwrap_or(false)
    }

    /// Adds or removes the displayed entry. `Ok(None)` when nothing is
    /// displayed.
    pub fn toggle_favorite(&mut self) -> Result<Option<ToggleOutcome>, Alert> {
        let Some(entry) = self.current() else {
            return Ok(None);
        };

        let (outcome, favorites) = self.favorites.toggle_collection(&entry).map_err(|err| {
            error!(id = %entry.id, error = %err, "failed to save favorites");
            Alert::error(FAVORITE_SAVE_FAILED_MESSAGE)
        })?;

        // Other screens may have edited the collection since the last reload.
        self.favorite_ids = favorites.iter().map(|f| f.id().to_string()).collect();

        let count = u32::try_from(favorites.len()).unwrap_or(u32::MAX);
        if let Err(err) = self.statistics.set_favorite_count(count) {
            warn!(error = %err, "failed to update favorite count");
        }

        Ok(Some(outcome))
    }

    /// Waits for a running background fetch, if any.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.pending_fetch.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "prefetch task failed");
            }
        }
    }

    pub fn open_profile(&self) -> Route {
        Route::Profile
    }

    pub fn open_favorites(&self) -> Route {
        Route::Favorites
    }

    fn spawn_prefetch(&mut self) {
        if self
            .pending_fetch
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
        {
            debug!("prefetch already running");
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, skipping prefetch");
            return;
        };

        let feed = Arc::clone(&self.feed);
        let notices = self.notices.clone();
        self.pending_fetch = Some(runtime.spawn(async move {
            if feed.fetch_next().await.is_err() {
                notices.push(Alert::error(LOAD_FAILED_MESSAGE));
            }
        }));
    }

    fn record_view(&self) {
        if self.feed.is_empty() {
            return;
        }
        if let Err(err) = self.statistics.record_view(Utc::now()) {
            warn!(error = %err, "failed to record view");
        }
    }
}
