//! 本地存储模块
//!
//! 以 SQLite 为后端的强类型键值存储：
//! - 每个键由 [`StoreKey`] 描述（键名、数据版本、值类型）
//! - 每条记录保存自身的 `schema_version`，读取旧版本时自动升级并回写
//! - 收藏、统计、设置各自有一个仓库封装

// ============================================================
// 子模块声明
// ============================================================

pub mod favorites;
pub mod keys;
pub mod migrations;
pub mod settings;
pub mod statistics;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use favorites::{FavoritesRepository, ToggleOutcome};
pub use keys::{FavoriteWordsKey, StoreKey, UserSettingsKey, UserStatsKey};
pub use migrations::run_migrations;
pub use settings::SettingsRepository;
pub use statistics::StatisticsRepository;

// ============================================================
// 依赖导入
// ============================================================

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("迁移错误: {0}")]
    Migration(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("不支持的数据版本: {key} v{found}（当前支持 v{supported}）")]
    UnsupportedVersion { key: String, found: u32, supported: u32 },

    #[error("锁获取失败: {0}")]
    LockError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

// ============================================================
// LocalStore - 键值存储
// ============================================================

/// 本地键值存储
///
/// 可廉价克隆，克隆之间共享同一个连接。
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

/// 原始记录
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub schema_version: u32,
    pub value: String,
    pub updated_at: i64,
}

impl LocalStore {
    /// 打开（必要时创建）数据库文件，并运行迁移
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        let connection = Connection::open(&db_path)?;

        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;

        Self::with_connection(connection, path_str)
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::with_connection(connection, ":memory:".to_string())
    }

    fn with_connection(connection: Connection, db_path: String) -> StorageResult<Self> {
        migrations::run_migrations(&connection)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path,
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    // ========== 原始记录操作 ==========

    /// 读取原始记录
    pub fn get_raw(&self, key: &str) -> StorageResult<Option<RawEntry>> {
        let conn = self.get_conn()?;
        let entry = conn
            .query_row(
                "SELECT schema_version, value, updated_at FROM kv_store WHERE key = ?1",
                params![key],
                |row| {
                    Ok(RawEntry {
                        schema_version: row.get(0)?,
                        value: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// 写入原始记录（整体替换）
    pub fn put_raw(&self, key: &str, schema_version: u32, value: &str) -> StorageResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, schema_version, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, schema_version, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    /// 导入没有版本信息的旧数据块，记为版本 0，首次读取时升级
    pub fn import_legacy_blob(&self, key: &str, value: &str) -> StorageResult<()> {
        serde_json::from_str::<serde_json::Value>(value)?;
        self.put_raw(key, 0, value)
    }

    // ========== 强类型操作 ==========

    /// 读取键值；不存在时返回 `None`
    ///
    /// 旧版本数据经 [`StoreKey::upgrade`] 升级后以当前版本回写；
    /// 比当前版本更新的数据视为错误。
    pub fn get<K: StoreKey>(&self) -> StorageResult<Option<K::Value>> {
        let Some(raw) = self.get_raw(K::NAME)? else {
            return Ok(None);
        };

        if raw.schema_version > K::VERSION {
            return Err(StorageError::UnsupportedVersion {
                key: K::NAME.to_string(),
                found: raw.schema_version,
                supported: K::VERSION,
            });
        }

        if raw.schema_version == K::VERSION {
            return Ok(Some(serde_json::from_str(&raw.value)?));
        }

        let json: serde_json::Value = serde_json::from_str(&raw.value)?;
        let value = K::upgrade(raw.schema_version, json)?;
        self.put::<K>(&value)?;
        tracing::info!(
            key = K::NAME,
            from = raw.schema_version,
            to = K::VERSION,
            "upgraded stored value"
        );
        Ok(Some(value))
    }

    /// 读取键值；不存在或读取失败时返回默认值（失败会记录日志）
    pub fn get_or_default<K: StoreKey>(&self) -> K::Value
    where
        K::Value: Default,
    {
        match self.get::<K>() {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(key = K::NAME, error = %err, "failed to read stored value, using default");
                K::Value::default()
            }
        }
    }

    /// 以当前版本整体写入
    pub fn put<K: StoreKey>(&self, value: &K::Value) -> StorageResult<()> {
        let json = serde_json::to_string(value)?;
        self.put_raw(K::NAME, K::VERSION, &json)
    }

    /// 删除键，返回是否确实删除了记录
    pub fn remove<K: StoreKey>(&self) -> StorageResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM kv_store WHERE key = ?1", params![K::NAME])?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserSettings;

    #[test]
    fn typed_round_trip_records_version() {
        let store = LocalStore::in_memory().unwrap();
        assert!(store.get::<UserSettingsKey>().unwrap().is_none());

        let settings = UserSettings {
            sound_effects: true,
            ..Default::default()
        };
        store.put::<UserSettingsKey>(&settings).unwrap();

        assert_eq!(store.get::<UserSettingsKey>().unwrap(), Some(settings));
        let raw = store.get_raw(UserSettingsKey::NAME).unwrap().unwrap();
        assert_eq!(raw.schema_version, UserSettingsKey::VERSION);
    }

    #[test]
    fn newer_schema_is_rejected_and_defaults() {
        let store = LocalStore::in_memory().unwrap();
        store
            .put_raw(UserSettingsKey::NAME, UserSettingsKey::VERSION + 1, "{}")
            .unwrap();

        let err = store.get::<UserSettingsKey>().unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedVersion { .. }));
        assert_eq!(store.get_or_default::<UserSettingsKey>(), UserSettings::default());
    }

    #[test]
    fn corrupt_value_defaults() {
        let store = LocalStore::in_memory().unwrap();
        store
            .put_raw(UserSettingsKey::NAME, UserSettingsKey::VERSION, "not json")
            .unwrap();
        assert_eq!(store.get_or_default::<UserSettingsKey>(), UserSettings::default());
    }

    #[test]
    fn remove_reports_presence() {
        let store = LocalStore::in_memory().unwrap();
        store.put::<UserSettingsKey>(&UserSettings::default()).unwrap();
        assert!(store.remove::<UserSettingsKey>().unwrap());
        assert!(!store.remove::<UserSettingsKey>().unwrap());
    }

    #[test]
    fn file_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexideck.db");

        {
            let store = LocalStore::open(&path).unwrap();
            store
                .put::<UserSettingsKey>(&UserSettings::default().with(crate::models::Setting::DarkMode, false))
                .unwrap();
        }

        let store = LocalStore::open(&path).unwrap();
        let settings = store.get::<UserSettingsKey>().unwrap().unwrap();
        assert!(!settings.dark_mode);
    }
}
