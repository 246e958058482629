//! Application configuration constants
//!
//! Central location for configuration constants, resource limits,
//! and validation boundaries used throughout the service layer.

// ===== Snapshot / Archive Format =====

/// Format version stamped into every snapshot. Restore refuses any
/// archive whose version does not match.
pub const SNAPSHOT_FORMAT_VERSION: &str = "1";

/// Name of the single entry inside a backup archive
pub const SNAPSHOT_ENTRY_NAME: &str = "snapshot.json";

/// Prefix for backup archive filenames (`clubdesk_20240115_093000.zip`)
pub const BACKUP_FILE_PREFIX: &str = "clubdesk";

/// Extension for backup archives
pub const BACKUP_FILE_EXTENSION: &str = "zip";

/// Name of the backup history side file, stored next to the archives
pub const BACKUP_HISTORY_FILE: &str = "backup_history.json";

/// Only audit logs newer than this many days are captured in a snapshot
pub const AUDIT_SNAPSHOT_WINDOW_DAYS: i64 = 90;

// ===== Backup Retention Limits =====

/// Default backup retention in days when no setting is stored
pub const DEFAULT_BACKUP_RETENTION_DAYS: u32 = 30;

/// Minimum backup retention in days (at least 1 day)
pub const MIN_BACKUP_RETENTION_DAYS: u32 = 1;

/// Maximum backup retention in days (1 year — prevents unbounded growth)
pub const MAX_BACKUP_RETENTION_DAYS: u32 = 365;

// ===== Member Validation Limits =====

/// Minimum password length for member accounts
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length for member display names
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

// ===== Sessions =====

/// Session lifetime in hours before a token expires
pub const SESSION_LIFETIME_HOURS: i64 = 12;

/// Name of the flat session bookkeeping file
pub const SESSION_FILE: &str = "sessions.json";
