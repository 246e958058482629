//! Settings service
//!
//! Scoped key/value configuration on top of the settings table. Scope
//! `"app"` holds global settings; entity scopes such as `"club:<id>"`
//! hold per-entity configuration. Typed accessors parse with defaults
//! and clamp to the documented ranges.

use crate::config;
use crate::database::{Repository, Setting};
use crate::error::Result;

/// Global scope for application-wide settings
pub const APP_SCOPE: &str = "app";

/// Setting key for backup retention
pub const BACKUP_RETENTION_KEY: &str = "backup.retention_days";

/// Service for scoped configuration
#[derive(Clone)]
pub struct SettingsService {
    repo: Repository,
}

impl SettingsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Scope string for per-club settings
    pub fn club_scope(club_id: &str) -> String {
        format!("club:{}", club_id)
    }

    /// Get a raw setting value
    pub async fn get(&self, scope: &str, key: &str) -> Result<Option<String>> {
        self.repo.get_setting(scope, key).await
    }

    /// Set a raw setting value
    pub async fn set(&self, scope: &str, key: &str, value: &str) -> Result<()> {
        self.repo.set_setting(scope, key, value).await
    }

    /// Remove a setting
    pub async fn delete(&self, scope: &str, key: &str) -> Result<()> {
        self.repo.delete_setting(scope, key).await
    }

    /// List every setting within a scope
    pub async fn list(&self, scope: &str) -> Result<Vec<Setting>> {
        self.repo.list_settings(scope).await
    }

    /// Boolean feature toggle; absent or unparseable values read as false
    pub async fn get_flag(&self, scope: &str, key: &str) -> Result<bool> {
        let value = self.repo.get_setting(scope, key).await?;
        Ok(matches!(value.as_deref(), Some("true") | Some("1")))
    }

    /// Backup retention in days, defaulted and clamped to the valid range
    pub async fn backup_retention_days(&self) -> Result<u32> {
        let days = match self.repo.get_setting(APP_SCOPE, BACKUP_RETENTION_KEY).await? {
            Some(value) => match value.parse::<u32>() {
                Ok(days) => days,
                Err(_) => {
                    tracing::warn!("Invalid backup retention value {:?}, using default", value);
                    config::DEFAULT_BACKUP_RETENTION_DAYS
                }
            },
            None => config::DEFAULT_BACKUP_RETENTION_DAYS,
        };

        Ok(days.clamp(
            config::MIN_BACKUP_RETENTION_DAYS,
            config::MAX_BACKUP_RETENTION_DAYS,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> SettingsService {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        SettingsService::new(Repository::new(pool))
    }

    #[tokio::test]
    async fn test_retention_defaults_when_unset() {
        let service = create_test_service().await;

        let days = service.backup_retention_days().await.unwrap();
        assert_eq!(days, config::DEFAULT_BACKUP_RETENTION_DAYS);
    }

    #[tokio::test]
    async fn test_retention_clamped_to_range() {
        let service = create_test_service().await;

        service
            .set(APP_SCOPE, BACKUP_RETENTION_KEY, "9999")
            .await
            .unwrap();
        assert_eq!(
            service.backup_retention_days().await.unwrap(),
            config::MAX_BACKUP_RETENTION_DAYS
        );

        service
            .set(APP_SCOPE, BACKUP_RETENTION_KEY, "0")
            .await
            .unwrap();
        assert_eq!(
            service.backup_retention_days().await.unwrap(),
            config::MIN_BACKUP_RETENTION_DAYS
        );
    }

    #[tokio::test]
    async fn test_invalid_retention_falls_back_to_default() {
        let service = create_test_service().await;

        service
            .set(APP_SCOPE, BACKUP_RETENTION_KEY, "not-a-number")
            .await
            .unwrap();

        assert_eq!(
            service.backup_retention_days().await.unwrap(),
            config::DEFAULT_BACKUP_RETENTION_DAYS
        );
    }

    #[tokio::test]
    async fn test_club_scoped_settings_are_isolated() {
        let service = create_test_service().await;

        let scope_a = SettingsService::club_scope("a");
        let scope_b = SettingsService::club_scope("b");

        service.set(&scope_a, "meeting_day", "monday").await.unwrap();
        service.set(&scope_b, "meeting_day", "friday").await.unwrap();

        assert_eq!(
            service.get(&scope_a, "meeting_day").await.unwrap(),
            Some("monday".to_string())
        );
        assert_eq!(
            service.get(&scope_b, "meeting_day").await.unwrap(),
            Some("friday".to_string())
        );

        service.delete(&scope_a, "meeting_day").await.unwrap();
        assert!(service.get(&scope_a, "meeting_day").await.unwrap().is_none());
        assert_eq!(service.list(&scope_b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_feature_flags() {
        let service = create_test_service().await;

        assert!(!service.get_flag(APP_SCOPE, "email.enabled").await.unwrap());

        service.set(APP_SCOPE, "email.enabled", "true").await.unwrap();
        assert!(service.get_flag(APP_SCOPE, "email.enabled").await.unwrap());

        service.set(APP_SCOPE, "email.enabled", "nope").await.unwrap();
        assert!(!service.get_flag(APP_SCOPE, "email.enabled").await.unwrap());
    }
}
