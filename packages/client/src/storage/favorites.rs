//! 收藏仓库
//!
//! 收藏集合整体读写：每次变更都是一次完整的读-改-写。

use tracing::debug;

use crate::models::{FavoriteEntry, VocabularyEntry};
use crate::storage::{FavoriteWordsKey, LocalStore, StorageResult};

/// 切换收藏后的成员状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

impl ToggleOutcome {
    pub fn is_favorite(self) -> bool {
        matches!(self, ToggleOutcome::Added)
    }
}

#[derive(Clone)]
pub struct FavoritesRepository {
    store: LocalStore,
}

impl FavoritesRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// 读取收藏；不存在时为空
    pub fn load(&self) -> StorageResult<Vec<FavoriteEntry>> {
        Ok(self.store.get::<FavoriteWordsKey>()?.unwrap_or_default())
    }

    /// 读取收藏；读取失败时记录日志并返回空集合
    pub fn load_or_empty(&self) -> Vec<FavoriteEntry> {
        self.store.get_or_default::<FavoriteWordsKey>()
    }

    pub fn save(&self, favorites: &[FavoriteEntry]) -> StorageResult<()> {
        self.store.put::<FavoriteWordsKey>(&favorites.to_vec())
    }

    pub fn contains(&self, id: &str) -> StorageResult<bool> {
        Ok(self.load()?.iter().any(|f| f.id() == id))
    }

    /// 按 ID 切换收藏：不存在则加入快照，存在则移除
    pub fn toggle(&self, entry: &VocabularyEntry) -> StorageResult<ToggleOutcome> {
        self.toggle_collection(entry).map(|(outcome, _)| outcome)
    }

    /// 同 [`toggle`](Self::toggle)，并返回写入后的完整集合
    pub fn toggle_collection(
        &self,
        entry: &VocabularyEntry,
    ) -> StorageResult<(ToggleOutcome, Vec<FavoriteEntry>)> {
        let mut favorites = self.load()?;

        let outcome = match favorites.iter().position(|f| f.id() == entry.id) {
            Some(pos) => {
                favorites.remove(pos);
                ToggleOutcome::Removed
            }
            None => {
                favorites.push(FavoriteEntry::snapshot(entry));
                ToggleOutcome::Added
            }
        };

        self.save(&favorites)?;
        debug!(id = %entry.id, ?outcome, count = favorites.len(), "favorite toggled");
        Ok((outcome, favorites))
    }

    /// 移除指定 ID，返回移除后的集合
    pub fn remove(&self, id: &str) -> StorageResult<Vec<FavoriteEntry>> {
        let mut favorites = self.load()?;
        favorites.retain(|f| f.id() != id);
        self.save(&favorites)?;
        Ok(favorites)
    }

    pub fn clear(&self) -> StorageResult<()> {
        self.save(&[])
    }
}
