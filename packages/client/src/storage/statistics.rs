//! 统计仓库

use chrono::{DateTime, Utc};

use crate::models::UserStatistics;
use crate::storage::{LocalStore, StorageResult, UserStatsKey};

#[derive(Clone)]
pub struct StatisticsRepository {
    store: LocalStore,
}

impl StatisticsRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> StorageResult<Option<UserStatistics>> {
        self.store.get::<UserStatsKey>()
    }

    pub fn save(&self, stats: &UserStatistics) -> StorageResult<()> {
        self.store.put::<UserStatsKey>(stats)
    }

    /// 加载统计；不存在时初始化并写入。收藏数镜像总是刷新为 `favorite_count`
    pub fn load_or_init(
        &self,
        favorite_count: u32,
        join_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StorageResult<UserStatistics> {
        let stats = match self.load()? {
            Some(mut stats) => {
                if stats.favorite_words == favorite_count {
                    return Ok(stats);
                }
                stats.favorite_words = favorite_count;
                stats
            }
            None => UserStatistics::initial(favorite_count, join_date, now),
        };

        self.save(&stats)?;
        Ok(stats)
    }

    /// 重置进度，保留收藏数与加入日期
    pub fn reset(&self, now: DateTime<Utc>) -> StorageResult<UserStatistics> {
        let current = self.load()?.unwrap_or_default();
        let reset = current.reset(now);
        self.save(&reset)?;
        Ok(reset)
    }

    /// 更新收藏数镜像；统计不存在时不创建
    pub fn set_favorite_count(&self, count: u32) -> StorageResult<Option<UserStatistics>> {
        let Some(mut stats) = self.load()? else {
            return Ok(None);
        };
        stats.favorite_words = count;
        self.save(&stats)?;
        Ok(Some(stats))
    }

    /// 记录一次浏览；统计不存在时以 `now` 为加入日期初始化
    pub fn record_view(&self, now: DateTime<Utc>) -> StorageResult<UserStatistics> {
        let mut stats = self
            .load()?
            .unwrap_or_else(|| UserStatistics::initial(0, None, now));
        stats.record_view(now);
        self.save(&stats)?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn repo() -> StatisticsRepository {
        StatisticsRepository::new(LocalStore::in_memory().unwrap())
    }

    #[test]
    fn first_load_initializes_and_persists() {
        let repo = repo();
        let joined = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let stats = repo.load_or_init(3, Some(joined), now).unwrap();
        assert_eq!(stats.favorite_words, 3);
        assert_eq!(stats.daily_streak, 1);
        assert_eq!(stats.join_date, Some(joined));
        assert_eq!(repo.load().unwrap(), Some(stats));
    }

    #[test]
    fn later_loads_refresh_only_the_favorite_mirror() {
        let repo = repo();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut stored = UserStatistics::initial(1, None, now);
        stored.total_words_viewed = 40;
        repo.save(&stored).unwrap();

        let later = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let stats = repo.load_or_init(5, None, later).unwrap();
        assert_eq!(stats.favorite_words, 5);
        assert_eq!(stats.total_words_viewed, 40);
        assert_eq!(stats.join_date, Some(now));
    }

    #[test]
    fn reset_and_record_view() {
        let repo = repo();
        let day1 = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap();

        repo.record_view(day1).unwrap();
        let stats = repo.record_view(day2).unwrap();
        assert_eq!(stats.total_words_viewed, 2);
        assert_eq!(stats.daily_streak, 2);

        repo.set_favorite_count(4).unwrap();
        let reset = repo.reset(day2).unwrap();
        assert_eq!(reset.total_words_viewed, 0);
        assert_eq!(reset.daily_streak, 1);
        assert_eq!(reset.favorite_words, 4);
        assert_eq!(reset.join_date, Some(day1));
    }

    #[test]
    fn favorite_count_without_stats_is_a_no_op() {
        let repo = repo();
        assert_eq!(repo.set_favorite_count(2).unwrap(), None);
        assert_eq!(repo.load().unwrap(), None);
    }
}
