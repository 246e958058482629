//! Backup service
//!
//! Captures the whole store as one versioned snapshot, packaged as a
//! single-entry ZIP archive, and restores it atomically. A flat JSON
//! history file next to the archives tracks every backup taken.

use crate::config;
use crate::database::{Repository, Snapshot};
use crate::error::{AppError, Result};
use crate::security::SessionContext;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use zip::write::FileOptions;
use zip::ZipWriter;

use super::audit::AuditService;
use super::settings::SettingsService;

/// Metadata for one archive in the backup history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub file_name: String,
    pub path: String,
    pub size_bytes: u64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    /// Recomputed from file existence on every read
    pub valid: bool,
}

/// Backup service
#[derive(Clone)]
pub struct BackupService {
    repo: Repository,
    audit: AuditService,
    settings: SettingsService,
    backups_dir: PathBuf,
    history_path: PathBuf,
}

impl BackupService {
    pub fn new(
        repo: Repository,
        audit: AuditService,
        settings: SettingsService,
        backups_dir: PathBuf,
    ) -> Self {
        let history_path = backups_dir.join(config::BACKUP_HISTORY_FILE);
        Self {
            repo,
            audit,
            settings,
            backups_dir,
            history_path,
        }
    }

    /// Capture the current store into a new archive.
    ///
    /// Any read error aborts the whole backup; nothing partial is ever
    /// written to the final path.
    pub async fn create_backup(&self, ctx: &SessionContext) -> Result<PathBuf> {
        tracing::info!("Creating backup");

        fs::create_dir_all(&self.backups_dir).await?;

        let snapshot = self.build_snapshot().await?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let file_name = format!(
            "{}_{}.{}",
            config::BACKUP_FILE_PREFIX,
            timestamp,
            config::BACKUP_FILE_EXTENSION
        );
        let backup_path = self.backups_dir.join(&file_name);

        // Write to a temp file first, then rename into place
        let temp_path = self.backups_dir.join(format!("{}.tmp", file_name));
        write_archive(&temp_path, &snapshot)?;
        fs::rename(&temp_path, &backup_path).await?;

        let archive_bytes = fs::read(&backup_path).await?;
        let checksum = calculate_checksum(&archive_bytes);
        let size_bytes = archive_bytes.len() as u64;

        // Append to the history side file
        let mut history = self.load_history().await?;
        history.push(BackupInfo {
            file_name: file_name.clone(),
            path: backup_path.to_string_lossy().to_string(),
            size_bytes,
            checksum,
            created_at: Utc::now(),
            valid: true,
        });
        self.save_history(&history).await?;

        tracing::info!("Backup created: {:?} ({} bytes)", backup_path, size_bytes);

        self.audit
            .record_best_effort(ctx, "backup.created", &file_name)
            .await;

        // Retention problems must not fail the backup that just succeeded
        if let Err(e) = self.apply_retention().await {
            tracing::warn!("Retention sweep after backup failed: {}", e);
        }

        Ok(backup_path)
    }

    /// Build the in-memory snapshot of every collection
    pub async fn build_snapshot(&self) -> Result<Snapshot> {
        let collections = self.repo.load_snapshot_collections().await?;

        Ok(Snapshot {
            created_at: Utc::now(),
            format_version: config::SNAPSHOT_FORMAT_VERSION.to_string(),
            collections,
        })
    }

    /// Open an archive and deserialize its snapshot
    pub fn read_snapshot(&self, path: &Path) -> Result<Snapshot> {
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        if archive.len() == 0 {
            return Err(AppError::InvalidBackup("archive has no entries".to_string()));
        }

        let mut entry = archive
            .by_name(config::SNAPSHOT_ENTRY_NAME)
            .map_err(|_| AppError::InvalidBackup("snapshot entry missing".to_string()))?;

        let mut content = String::new();
        std::io::Read::read_to_string(&mut entry, &mut content)?;

        let snapshot: Snapshot = serde_json::from_str(&content)
            .map_err(|e| AppError::InvalidBackup(format!("snapshot does not parse: {}", e)))?;

        Ok(snapshot)
    }

    /// Check whether a path points at a usable backup archive.
    ///
    /// Returns false (never an error) when the file is missing, has the
    /// wrong extension, contains no readable snapshot, or carries an
    /// empty format version. Called before every restore.
    pub async fn validate(&self, path: &Path) -> bool {
        if !path.exists() {
            tracing::debug!("Validate failed, file missing: {:?}", path);
            return false;
        }

        let extension = path.extension().and_then(|e| e.to_str());
        if extension != Some(config::BACKUP_FILE_EXTENSION) {
            tracing::debug!("Validate failed, wrong extension: {:?}", path);
            return false;
        }

        match self.read_snapshot(path) {
            Ok(snapshot) if snapshot.format_version.is_empty() => {
                tracing::debug!("Validate failed, empty format version: {:?}", path);
                false
            }
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Validate failed for {:?}: {}", path, e);
                false
            }
        }
    }

    /// Restore the store from an archive.
    ///
    /// Re-validates first, rejects unsupported format versions, then
    /// hands the snapshot to the repository's single-transaction
    /// restore. Either the whole snapshot lands or nothing changes.
    pub async fn restore_backup(&self, ctx: &SessionContext, path: &Path) -> Result<()> {
        tracing::info!("Restoring from backup: {:?}", path);

        if !self.validate(path).await {
            tracing::error!("Refusing restore from invalid archive: {:?}", path);
            return Err(AppError::InvalidBackup(format!(
                "not a usable backup archive: {}",
                path.display()
            )));
        }

        let snapshot = self.read_snapshot(path)?;

        if snapshot.format_version != config::SNAPSHOT_FORMAT_VERSION {
            return Err(AppError::InvalidBackup(format!(
                "unsupported format version: {}",
                snapshot.format_version
            )));
        }

        self.repo.restore_snapshot(&snapshot).await?;

        // The restore replaced the audit table; record on top of it
        self.audit
            .record_best_effort(ctx, "backup.restored", &path.display().to_string())
            .await;

        tracing::info!("Restore completed successfully");
        Ok(())
    }

    /// List the backup history, newest first, with validity recomputed
    /// from file existence.
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let mut history = self.load_history().await?;

        for info in &mut history {
            info.valid = Path::new(&info.path).exists();
        }

        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(history)
    }

    /// Delete archives and history entries older than the configured
    /// retention. Failures on individual files are logged and skipped;
    /// their entries stay for the next sweep.
    pub async fn apply_retention(&self) -> Result<()> {
        let retention_days = self.settings.backup_retention_days().await?;
        let cutoff = Utc::now() - Duration::days(retention_days as i64);

        let history = self.load_history().await?;
        let mut kept = Vec::with_capacity(history.len());
        let mut removed = 0usize;

        for info in history {
            if info.created_at >= cutoff {
                kept.push(info);
                continue;
            }

            match fs::remove_file(&info.path).await {
                Ok(()) => {
                    tracing::info!("Deleted old backup: {}", info.path);
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // File already gone, drop the stale entry
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to delete backup file {}: {}", info.path, e);
                    kept.push(info);
                }
            }
        }

        if removed > 0 {
            self.save_history(&kept).await?;
            tracing::info!(
                "Retention sweep removed {} backups older than {} days",
                removed,
                retention_days
            );
        }

        Ok(())
    }

    async fn load_history(&self) -> Result<Vec<BackupInfo>> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.history_path).await?;
        let history: Vec<BackupInfo> = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse backup history: {}", e)))?;

        Ok(history)
    }

    async fn save_history(&self, history: &[BackupInfo]) -> Result<()> {
        let content = serde_json::to_string_pretty(history)?;
        fs::write(&self.history_path, content).await?;
        Ok(())
    }
}

/// Serialize a snapshot into a single-entry deflate ZIP at `path`
fn write_archive(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;

    let file = std::fs::File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(config::SNAPSHOT_ENTRY_NAME, options)?;
    std::io::Write::write_all(&mut zip, json.as_bytes())?;
    zip.finish()?;

    Ok(())
}

fn calculate_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        initialize_database, CreateClubRequest, CreateEventRequest, CreateUserRequest, UserRole,
    };
    use crate::services::settings::{APP_SCOPE, BACKUP_RETENTION_KEY};
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    async fn create_test_service() -> (BackupService, Repository, TempDir) {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let temp = TempDir::new().unwrap();
        let repo = Repository::new(pool);
        let audit = AuditService::new(repo.clone());
        let settings = SettingsService::new(repo.clone());
        let service = BackupService::new(
            repo.clone(),
            audit,
            settings,
            temp.path().join("backups"),
        );

        (service, repo, temp)
    }

    async fn seed_store(repo: &Repository, clubs: usize, users: usize, events: usize) {
        let mut club_ids = Vec::new();
        for i in 0..clubs {
            let club = repo
                .create_club(CreateClubRequest {
                    name: format!("Club {}", i),
                    description: None,
                })
                .await
                .unwrap();
            club_ids.push(club.id);
        }

        for i in 0..users {
            repo.create_user(CreateUserRequest {
                club_id: club_ids.first().cloned(),
                email: format!("member{}@example.com", i),
                display_name: format!("Member {}", i),
                password_hash: "$argon2id$fake".to_string(),
                role: UserRole::Member,
            })
            .await
            .unwrap();
        }

        for i in 0..events {
            repo.create_event(CreateEventRequest {
                club_id: club_ids[0].clone(),
                title: format!("Event {}", i),
                location: None,
                starts_at: Utc::now(),
                ends_at: None,
            })
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_backup_writes_archive_and_history() {
        let (service, repo, _temp) = create_test_service().await;
        seed_store(&repo, 1, 1, 0).await;

        let ctx = SessionContext::system();
        let path = service.create_backup(&ctx).await.unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(config::BACKUP_FILE_PREFIX));
        assert!(name.ends_with(".zip"));

        let history = service.list_backups().await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].valid);
        assert!(history[0].size_bytes > 0);
        assert!(!history[0].checksum.is_empty());
    }

    #[tokio::test]
    async fn test_validate_accepts_fresh_backup() {
        let (service, _repo, _temp) = create_test_service().await;

        let path = service
            .create_backup(&SessionContext::system())
            .await
            .unwrap();

        assert!(service.validate(&path).await);
    }

    #[tokio::test]
    async fn test_validate_rejects_missing_file() {
        let (service, _repo, temp) = create_test_service().await;

        let path = temp.path().join("does_not_exist.zip");
        assert!(!service.validate(&path).await);
    }

    #[tokio::test]
    async fn test_validate_rejects_wrong_extension() {
        let (service, _repo, temp) = create_test_service().await;

        let path = temp.path().join("backup.txt");
        std::fs::write(&path, b"not a backup").unwrap();

        assert!(!service.validate(&path).await);
    }

    #[tokio::test]
    async fn test_validate_rejects_empty_archive() {
        let (service, _repo, temp) = create_test_service().await;

        let path = temp.path().join("empty.zip");
        let file = std::fs::File::create(&path).unwrap();
        let zip = ZipWriter::new(file);
        zip.finish().unwrap();

        assert!(!service.validate(&path).await);
    }

    #[tokio::test]
    async fn test_validate_rejects_garbage_entry() {
        let (service, _repo, temp) = create_test_service().await;

        let path = temp.path().join("garbage.zip");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(config::SNAPSHOT_ENTRY_NAME, options).unwrap();
        std::io::Write::write_all(&mut zip, b"this is not json").unwrap();
        zip.finish().unwrap();

        assert!(!service.validate(&path).await);
    }

    #[tokio::test]
    async fn test_validate_rejects_empty_version() {
        let (service, _repo, temp) = create_test_service().await;

        let mut snapshot = service.build_snapshot().await.unwrap();
        snapshot.format_version = String::new();

        let path = temp.path().join("versionless.zip");
        write_archive(&path, &snapshot).unwrap();

        assert!(!service.validate(&path).await);
    }

    #[tokio::test]
    async fn test_restore_refuses_unsupported_version() {
        let (service, _repo, temp) = create_test_service().await;

        let mut snapshot = service.build_snapshot().await.unwrap();
        snapshot.format_version = "999".to_string();

        let path = temp.path().join("future.zip");
        write_archive(&path, &snapshot).unwrap();

        let result = service
            .restore_backup(&SessionContext::system(), &path)
            .await;
        assert!(matches!(result, Err(AppError::InvalidBackup(_))));
    }

    #[tokio::test]
    async fn test_restore_refuses_invalid_archive() {
        let (service, repo, temp) = create_test_service().await;
        seed_store(&repo, 1, 0, 0).await;

        let path = temp.path().join("bogus.zip");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let result = service
            .restore_backup(&SessionContext::system(), &path)
            .await;
        assert!(matches!(result, Err(AppError::InvalidBackup(_))));

        // Store untouched
        assert_eq!(repo.count_rows("clubs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_backup_restore_round_trip_counts() {
        let (service, repo, _temp) = create_test_service().await;
        seed_store(&repo, 3, 10, 5).await;

        let ctx = SessionContext::system();
        let path = service.create_backup(&ctx).await.unwrap();

        // Mutate the store after the backup
        repo.create_club(CreateClubRequest {
            name: "Post-backup Club".to_string(),
            description: None,
        })
        .await
        .unwrap();
        assert_eq!(repo.count_rows("clubs").await.unwrap(), 4);

        service.restore_backup(&ctx, &path).await.unwrap();

        assert_eq!(repo.count_rows("clubs").await.unwrap(), 3);
        assert_eq!(repo.count_rows("users").await.unwrap(), 10);
        assert_eq!(repo.count_rows("events").await.unwrap(), 5);
        assert_eq!(repo.count_rows("reports").await.unwrap(), 0);

        // The archive is still usable after the restore
        assert!(service.validate(&path).await);
    }

    #[tokio::test]
    async fn test_retention_sweep_removes_only_old_backups() {
        let (service, _repo, _temp) = create_test_service().await;
        fs::create_dir_all(&service.backups_dir).await.unwrap();

        service
            .settings
            .set(APP_SCOPE, BACKUP_RETENTION_KEY, "30")
            .await
            .unwrap();

        let old_path = service.backups_dir.join("clubdesk_old.zip");
        let new_path = service.backups_dir.join("clubdesk_new.zip");
        std::fs::write(&old_path, b"old").unwrap();
        std::fs::write(&new_path, b"new").unwrap();

        let history = vec![
            BackupInfo {
                file_name: "clubdesk_old.zip".to_string(),
                path: old_path.to_string_lossy().to_string(),
                size_bytes: 3,
                checksum: String::new(),
                created_at: Utc::now() - Duration::days(40),
                valid: true,
            },
            BackupInfo {
                file_name: "clubdesk_new.zip".to_string(),
                path: new_path.to_string_lossy().to_string(),
                size_bytes: 3,
                checksum: String::new(),
                created_at: Utc::now() - Duration::days(10),
                valid: true,
            },
        ];
        service.save_history(&history).await.unwrap();

        service.apply_retention().await.unwrap();

        assert!(!old_path.exists());
        assert!(new_path.exists());

        let remaining = service.list_backups().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].file_name, "clubdesk_new.zip");
    }

    #[tokio::test]
    async fn test_history_validity_recomputed_on_read() {
        let (service, repo, _temp) = create_test_service().await;
        seed_store(&repo, 1, 0, 0).await;

        let path = service
            .create_backup(&SessionContext::system())
            .await
            .unwrap();

        std::fs::remove_file(&path).unwrap();

        let history = service.list_backups().await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].valid);
    }
}
