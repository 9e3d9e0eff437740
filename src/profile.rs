//! User profile, preferences and settings
//!
//! Each lives under its own key as an independent JSON value. Writes that
//! hit the device quota reclaim old training records once and retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::backend::KvStore;
use crate::errors::{Result, StoreError};
use crate::records::RecordStore;

pub const PROFILE_KEY: &str = "user_profile";
pub const PREFERENCES_KEY: &str = "user_preferences";
pub const SETTINGS_KEY: &str = "user_settings";

/// Local user identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

impl UserProfile {
    /// Fresh local profile with a random id
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            avatar: String::new(),
            created_at: now,
            last_login_at: now,
        }
    }
}

/// In-game preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub theme: String,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub language: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            sound_enabled: true,
            vibration_enabled: true,
            language: "zh-CN".to_string(),
        }
    }
}

/// App-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub theme: String,
    pub language: String,
    pub notifications: bool,
    /// Sync after sign-in without asking
    pub auto_sync: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            language: "zh-CN".to_string(),
            notifications: true,
            auto_sync: true,
        }
    }
}

/// Access to the single-value user keys
pub struct UserDataStore {
    kv: KvStore,
    records: Arc<RecordStore>,
}

impl UserDataStore {
    pub fn new(kv: KvStore, records: Arc<RecordStore>) -> Self {
        Self { kv, records }
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.kv.get_opt(PROFILE_KEY).await
    }

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.write(PROFILE_KEY, profile).await
    }

    /// Stamp `last_login_at` on the stored profile, creating one if needed
    pub async fn touch_login(&self, default_name: &str) -> Result<UserProfile> {
        let mut profile = self
            .profile()
            .await
            .unwrap_or_else(|| UserProfile::new(default_name));
        profile.last_login_at = Utc::now();
        self.save_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn clear_profile(&self) -> Result<()> {
        self.kv.remove(PROFILE_KEY).await
    }

    pub async fn preferences(&self) -> UserPreferences {
        self.kv.get(PREFERENCES_KEY, UserPreferences::default()).await
    }

    pub async fn save_preferences(&self, preferences: &UserPreferences) -> Result<()> {
        self.write(PREFERENCES_KEY, preferences).await
    }

    pub async fn settings(&self) -> UserSettings {
        self.kv.get(SETTINGS_KEY, UserSettings::default()).await
    }

    pub async fn save_settings(&self, settings: &UserSettings) -> Result<()> {
        self.write(SETTINGS_KEY, settings).await
    }

    /// Merge a partial JSON object into the current settings
    pub async fn update_settings(&self, patch: serde_json::Value) -> Result<UserSettings> {
        let serde_json::Value::Object(patch) = patch else {
            return Err(StoreError::InvalidImport(
                "settings patch must be a JSON object".to_string(),
            ));
        };

        let mut current = serde_json::to_value(self.settings().await)?;
        if let serde_json::Value::Object(fields) = &mut current {
            fields.extend(patch);
        }
        let merged: UserSettings = serde_json::from_value(current)?;
        self.save_settings(&merged).await?;
        Ok(merged)
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        match self.kv.set(key, value).await {
            Err(e) if e.is_quota() => {
                let reclaimed = self.records.reclaim_space().await?;
                let days = self.records.policy().quota_recovery_days;
                warn!(key, reclaimed, days, "storage quota exceeded, reclaimed records and retrying");

                self.kv.set(key, value).await.map_err(|retry| {
                    if retry.is_quota() {
                        StoreError::StorageFull {
                            key: self.kv.full_key(key),
                            reclaimed_days: days,
                        }
                    } else {
                        retry
                    }
                })
            }
            other => other,
        }
    }
}
