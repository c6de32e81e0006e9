//! 存储键定义
//!
//! 每个键绑定一个值类型和一个数据版本。版本 0 表示导入的无版本旧数据。

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::models::{FavoriteEntry, UserSettings, UserStatistics};
use crate::storage::{StorageError, StorageResult};

/// 强类型存储键
pub trait StoreKey {
    type Value: Serialize + DeserializeOwned;

    /// 存储中的键名
    const NAME: &'static str;

    /// 当前数据版本
    const VERSION: u32;

    /// 把 `from_version` 版本的 JSON 升级为当前值类型
    ///
    /// 默认实现假设结构未变，直接反序列化。
    fn upgrade(from_version: u32, raw: Value) -> StorageResult<Self::Value> {
        let _ = from_version;
        Ok(serde_json::from_value(raw)?)
    }
}

// ============================================================
// favoriteWords
// ============================================================

pub struct FavoriteWordsKey;

impl StoreKey for FavoriteWordsKey {
    type Value = Vec<FavoriteEntry>;

    const NAME: &'static str = "favoriteWords";
    const VERSION: u32 = 1;

    fn upgrade(from_version: u32, raw: Value) -> StorageResult<Self::Value> {
        match from_version {
            0 => {
                let Value::Array(items) = raw else {
                    return Err(StorageError::Serialization(
                        "favoriteWords 旧数据不是数组".to_string(),
                    ));
                };
                let items = items.into_iter().map(upgrade_legacy_favorite).collect();
                Ok(serde_json::from_value(Value::Array(items))?)
            }
            _ => Ok(serde_json::from_value(raw)?),
        }
    }
}

/// 旧数据中的 `createdAt` 是远端时间戳对象 `{seconds, nanoseconds}`，
/// 转为 RFC 3339 字符串；无法识别的时间字段直接丢弃
fn upgrade_legacy_favorite(mut item: Value) -> Value {
    let Some(object) = item.as_object_mut() else {
        return item;
    };

    if let Some(created_at) = object.remove("createdAt") {
        if let Some(timestamp) = legacy_timestamp(&created_at) {
            object.insert("createdAt".to_string(), Value::String(timestamp.to_rfc3339()));
        }
    }

    if !object.contains_key("id") {
        if let Some(word) = object.get("word").cloned() {
            object.insert("id".to_string(), word);
        }
    }

    item
}

fn legacy_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc2822(s)
            .or_else(|_| DateTime::parse_from_rfc3339(s))
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Object(map) => {
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"))?.as_i64()?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}

// ============================================================
// userStats / userSettings
// ============================================================

pub struct UserStatsKey;

impl StoreKey for UserStatsKey {
    type Value = UserStatistics;

    const NAME: &'static str = "userStats";
    const VERSION: u32 = 1;

    fn upgrade(from_version: u32, mut raw: Value) -> StorageResult<Self::Value> {
        if from_version == 0 {
            if let Some(object) = raw.as_object_mut() {
                for field in ["joinDate", "lastActiveDate"] {
                    normalize_timestamp(object, field);
                }
            }
        }
        Ok(serde_json::from_value(raw)?)
    }
}

/// 旧统计中的日期可能是 RFC 2822 字符串（如 `Mon, 06 Jan 2025 10:00:00 GMT`）
/// 或时间戳对象，统一为 RFC 3339；无法识别时置空
fn normalize_timestamp(object: &mut serde_json::Map<String, Value>, field: &str) {
    if let Some(value) = object.remove(field) {
        let normalized = legacy_timestamp(&value)
            .map(|dt| Value::String(dt.to_rfc3339()))
            .unwrap_or(Value::Null);
        object.insert(field.to_string(), normalized);
    }
}

pub struct UserSettingsKey;

impl StoreKey for UserSettingsKey {
    type Value = UserSettings;

    const NAME: &'static str = "userSettings";
    const VERSION: u32 = 1;
}
