//! 领域模型
//!
//! 远端词条、本地收藏快照、账户资料，以及本地持久化的统计与设置。

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================
// 词条
// ============================================================

/// 远端 `vocabulary` 集合中的一个词条
///
/// `id` 即文档 ID，种子数据写入时等于 `word` 本身。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub id: String,
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noun: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl VocabularyEntry {
    /// 以单词本身作为 ID 创建词条
    pub fn new(word: impl Into<String>) -> Self {
        let word = word.into();
        Self {
            id: word.clone(),
            word,
            adjective: None,
            noun: None,
            example: None,
            synonyms: Vec::new(),
            created_at: None,
        }
    }
}

/// 收藏的词条快照
///
/// 收藏时整份复制，之后远端词条的修改不会回流到这里。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteEntry {
    pub entry: VocabularyEntry,
}

impl FavoriteEntry {
    pub fn snapshot(entry: &VocabularyEntry) -> Self {
        Self {
            entry: entry.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }
}

// ============================================================
// 账户
// ============================================================

/// 账户系统返回的用户资料（只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn display_name_or_default(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("User")
    }
}

/// 注册成功后写入远端 `users/{uid}` 的用户记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub profile_complete: bool,
    pub vocab_progress: VocabProgress,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabProgress {
    pub total_words: u32,
    pub mastered_words: u32,
    pub streak: u32,
}

impl UserRecord {
    pub fn for_new_account(uid: &str, username: &str, email: &str, now: DateTime<Utc>) -> Self {
        let username = username.trim().to_string();
        Self {
            uid: uid.to_string(),
            display_name: username.clone(),
            username,
            email: email.trim().to_lowercase(),
            created_at: now,
            updated_at: now,
            profile_complete: false,
            vocab_progress: VocabProgress::default(),
        }
    }
}

// ============================================================
// 本地统计
// ============================================================

/// 本地持久化的学习统计
///
/// 整体读写，单写者假设（同一设备、同一前台页面）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    /// 收藏数镜像
    #[serde(default)]
    pub favorite_words: u32,
    #[serde(default)]
    pub total_words_viewed: u32,
    #[serde(default)]
    pub daily_streak: u32,
    #[serde(default)]
    pub join_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_active_date: Option<DateTime<Utc>>,
}

impl UserStatistics {
    /// 首次加载资料页时的初始统计
    pub fn initial(favorite_words: u32, join_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            favorite_words,
            total_words_viewed: 0,
            daily_streak: 1,
            join_date: Some(join_date.unwrap_or(now)),
            last_active_date: Some(now),
        }
    }

    /// 重置进度：保留收藏数与加入日期
    pub fn reset(&self, now: DateTime<Utc>) -> Self {
        Self {
            favorite_words: self.favorite_words,
            total_words_viewed: 0,
            daily_streak: 1,
            join_date: self.join_date,
            last_active_date: Some(now),
        }
    }

    /// 记录一次浏览，并按自然日推进连续天数
    pub fn record_view(&mut self, now: DateTime<Utc>) {
        self.total_words_viewed = self.total_words_viewed.saturating_add(1);

        let today = now.date_naive();
        self.daily_streak = match self.last_active_date.map(|d| d.date_naive()) {
            Some(last) if last == today => self.daily_streak.max(1),
            Some(last) if is_next_day(last, today) => self.daily_streak.saturating_add(1),
            _ => 1,
        };
        self.last_active_date = Some(now);
    }

    /// 自加入起经过的天数（向上取整）
    pub fn days_active(&self, now: DateTime<Utc>) -> i64 {
        let Some(join_date) = self.join_date else {
            return 0;
        };
        let millis = (now - join_date).num_milliseconds().abs();
        let day = Duration::days(1).num_milliseconds();
        (millis + day - 1) / day
    }
}

fn is_next_day(last: NaiveDate, today: NaiveDate) -> bool {
    last.succ_opt() == Some(today)
}

/// "Member since" 的展示格式，例如 `January 5, 2025`
pub fn format_member_since(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => date.format("%B %-d, %Y").to_string(),
        None => "Unknown".to_string(),
    }
}

// ============================================================
// 本地设置
// ============================================================

/// 本地持久化的开关设置，每次修改整体替换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub daily_reminders: bool,
    pub dark_mode: bool,
    pub sound_effects: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            daily_reminders: true,
            dark_mode: true,
            sound_effects: false,
        }
    }
}

/// 可切换的设置项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    DailyReminders,
    DarkMode,
    SoundEffects,
}

impl UserSettings {
    pub fn with(self, setting: Setting, value: bool) -> Self {
        let mut next = self;
        match setting {
            Setting::DailyReminders => next.daily_reminders = value,
            Setting::DarkMode => next.dark_mode = value,
            Setting::SoundEffects => next.sound_effects = value,
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn initial_stats_fall_back_to_now_for_join_date() {
        let now = at(2025, 3, 1, 12);
        let stats = UserStatistics::initial(4, None, now);
        assert_eq!(stats.favorite_words, 4);
        assert_eq!(stats.daily_streak, 1);
        assert_eq!(stats.join_date, Some(now));
    }

    #[test]
    fn reset_keeps_favorites_and_join_date() {
        let stats = UserStatistics {
            favorite_words: 7,
            total_words_viewed: 120,
            daily_streak: 9,
            join_date: Some(at(2024, 1, 1, 0)),
            last_active_date: Some(at(2025, 1, 1, 0)),
        };
        let now = at(2025, 2, 1, 0);
        let reset = stats.reset(now);
        assert_eq!(reset.favorite_words, 7);
        assert_eq!(reset.total_words_viewed, 0);
        assert_eq!(reset.daily_streak, 1);
        assert_eq!(reset.join_date, stats.join_date);
        assert_eq!(reset.last_active_date, Some(now));
    }

    #[test]
    fn streak_advances_by_calendar_day() {
        let mut stats = UserStatistics::initial(0, None, at(2025, 5, 1, 9));
        stats.record_view(at(2025, 5, 1, 22));
        assert_eq!(stats.daily_streak, 1);
        stats.record_view(at(2025, 5, 2, 8));
        assert_eq!(stats.daily_streak, 2);
        stats.record_view(at(2025, 5, 5, 8));
        assert_eq!(stats.daily_streak, 1);
        assert_eq!(stats.total_words_viewed, 3);
    }

    #[test]
    fn days_active_rounds_up() {
        let stats = UserStatistics {
            join_date: Some(at(2025, 1, 1, 0)),
            ..Default::default()
        };
        assert_eq!(stats.days_active(at(2025, 1, 1, 0)), 0);
        assert_eq!(stats.days_active(at(2025, 1, 1, 1)), 1);
        assert_eq!(stats.days_active(at(2025, 1, 3, 0)), 2);
        assert_eq!(UserStatistics::default().days_active(at(2025, 1, 3, 0)), 0);
    }

    #[test]
    fn member_since_formatting() {
        assert_eq!(format_member_since(Some(at(2025, 1, 5, 10))), "January 5, 2025");
        assert_eq!(format_member_since(None), "Unknown");
    }

    #[test]
    fn settings_toggle_replaces_single_field() {
        let settings = UserSettings::default().with(Setting::SoundEffects, true);
        assert!(settings.sound_effects);
        assert!(settings.daily_reminders);
        assert!(settings.dark_mode);
    }

    #[test]
    fn favorite_serializes_as_plain_entry() {
        let mut entry = VocabularyEntry::new("x");
        entry.synonyms = vec!["y".into()];
        let json = serde_json::to_value(FavoriteEntry::snapshot(&entry)).unwrap();
        assert_eq!(json["id"], "x");
        assert_eq!(json["synonyms"][0], "y");
    }
}
