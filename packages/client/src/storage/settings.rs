//! 设置仓库

use crate::models::{Setting, UserSettings};
use crate::storage::{LocalStore, StorageResult, UserSettingsKey};

#[derive(Clone)]
pub struct SettingsRepository {
    store: LocalStore,
}

impl SettingsRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// 读取设置；不存在或读取失败时为默认值
    pub fn load(&self) -> UserSettings {
        self.store.get_or_default::<UserSettingsKey>()
    }

    pub fn save(&self, settings: &UserSettings) -> StorageResult<()> {
        self.store.put::<UserSettingsKey>(settings)
    }

    /// 修改单个开关并整体写回
    pub fn set(&self, setting: Setting, value: bool) -> StorageResult<UserSettings> {
        let next = self.load().with(setting, value);
        self.save(&next)?;
        Ok(next)
    }
}
