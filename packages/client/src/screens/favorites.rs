use tracing::{error, warn};

use crate::error::Alert;
use crate::listing::CardNavigator;
use crate::models::FavoriteEntry;
use crate::presentation::WordCard;
use crate::screens::Route;
use crate::storage::{FavoritesRepository, StatisticsRepository};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load favorite words";
pub const REMOVE_FAILED_MESSAGE: &str = "Failed to remove from favorites.";

/// Browses the saved favorites with the same wrap rules as the home screen.
pub struct FavoritesScreen {
    favorites: FavoritesRepository,
    statistics: StatisticsRepository,
    entries: Vec<FavoriteEntry>,
    navigator: CardNavigator,
}

impl FavoritesScreen {
    pub fn new(favorites: FavoritesRepository, statistics: StatisticsRepository) -> Self {
        Self {
            favorites,
            statistics,
            entries: Vec::new(),
            navigator: CardNavigator::new(),
        }
    }

    /// Reads favorites from storage; called on mount and on every focus.
    pub fn reload(&mut self) -> Result<(), Alert> {
        let entries = self.favorites.load().map_err(|err| {
            error!(error = %err, "failed to load favorites");
            Alert::error(LOAD_FAILED_MESSAGE)
        })?;

        self.entries = entries;
        self.navigator.clamp(self.entries.len());
        Ok(())
    }

    pub fn entries(&self) -> &[FavoriteEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.navigator.index()
    }

    pub fn current(&self) -> Option<&FavoriteEntry> {
        self.entries.get(self.navigator.index())
    }

    pub fn card(&self) -> Option<WordCard> {
        self.current().map(|favorite| WordCard::new(&favorite.entry, true))
    }

    pub fn next(&mut self) -> usize {
        self.navigator.next(self.entries.len())
    }

    pub fn previous(&mut self) -> usize {
        self.navigator.previous(self.entries.len())
    }

    /// Removes the displayed favorite and keeps the index on a valid card.
    pub fn remove_current(&mut self) -> Result<Option<FavoriteEntry>, Alert> {
        let Some(current) = self.current().cloned() else {
            return Ok(None);
        };

        let remaining = self.favorites.remove(current.id()).map_err(|err| {
            error!(id = %current.id(), error = %err, "failed to remove favorite");
            Alert::error(REMOVE_FAILED_MESSAGE)
        })?;

        self.entries = remaining;
        self.navigator.clamp(self.entries.len());

        let count = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        if let Err(err) = self.statistics.set_favorite_count(count) {
            warn!(error = %err, "failed to update favorite count");
        }

        Ok(Some(current))
    }

    pub fn open_profile(&self) -> Route {
        Route::Profile
    }

    pub fn back_to_words(&self) -> Route {
        Route::Back
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VocabularyEntry;
    use crate::storage::{FavoriteWordsKey, LocalStore, StoreKey};

    fn screen_with(words: &[&str]) -> (FavoritesScreen, LocalStore) {
        let local = LocalStore::in_memory().unwrap();
        let favorites = FavoritesRepository::new(local.clone());
        for word in words {
            favorites.toggle(&VocabularyEntry::new(*word)).unwrap();
        }
        let screen = FavoritesScreen::new(favorites, StatisticsRepository::new(local.clone()));
        (screen, local)
    }

    #[test]
    fn empty_favorites_navigation_is_a_no_op() {
        let (mut screen, _) = screen_with(&[]);
        screen.reload().unwrap();
        assert!(screen.is_empty());
        assert_eq!(screen.next(), 0);
        assert_eq!(screen.previous(), 0);
        assert_eq!(screen.remove_current().unwrap(), None);
    }

    #[test]
    fn removing_last_card_clamps_index() {
        let (mut screen, _) = screen_with(&["a", "b", "c"]);
        screen.reload().unwrap();
        screen.previous();
        assert_eq!(screen.current().map(|f| f.id()), Some("c"));

        let removed = screen.remove_current().unwrap().unwrap();
        assert_eq!(removed.id(), "c");
        assert_eq!(screen.index(), 1);
        assert_eq!(screen.current().map(|f| f.id()), Some("b"));

        screen.remove_current().unwrap();
        screen.remove_current().unwrap();
        assert!(screen.is_empty());
        assert_eq!(screen.index(), 0);
    }

    #[test]
    fn reload_picks_up_external_changes() {
        let (mut screen, local) = screen_with(&["a", "b"]);
        screen.reload().unwrap();
        screen.next();

        FavoritesRepository::new(local).remove("b").unwrap();
        screen.reload().unwrap();
        assert_eq!(screen.index(), 0);
        assert_eq!(screen.entries().len(), 1);
        assert!(screen.card().unwrap().is_favorite);
    }

    #[test]
    fn unreadable_favorites_raise_alert() {
        let (mut screen, local) = screen_with(&[]);
        local
            .put_raw(FavoriteWordsKey::NAME, FavoriteWordsKey::VERSION, "{broken")
            .unwrap();
        assert_eq!(screen.reload().unwrap_err(), Alert::error(LOAD_FAILED_MESSAGE));
    }
}
