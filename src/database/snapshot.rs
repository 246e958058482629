//! Snapshot document
//!
//! A snapshot is the serialized bundle of all entity collections that a
//! backup archive carries. Collections are listed in dependency order
//! (parents before children); the restore path relies on that order and
//! on its exact reverse for deletes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{AuditLog, Club, Event, EventParticipant, Report, Setting, User};

/// Tables in the order restore must clear them: children before parents.
pub const RESTORE_DELETE_ORDER: [&str; 7] = [
    "audit_logs",
    "settings",
    "reports",
    "event_participants",
    "events",
    "users",
    "clubs",
];

/// Tables in the order restore must repopulate them: parents before
/// children, so foreign keys in child rows resolve.
pub const RESTORE_INSERT_ORDER: [&str; 7] = [
    "clubs",
    "users",
    "events",
    "event_participants",
    "reports",
    "settings",
    "audit_logs",
];

/// One versioned backup document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub created_at: DateTime<Utc>,
    /// Checked before restore; an empty or unknown version is rejected
    #[serde(default)]
    pub format_version: String,
    pub collections: SnapshotCollections,
}

/// Full entity collections captured by one backup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCollections {
    #[serde(default)]
    pub clubs: Vec<Club>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub event_participants: Vec<EventParticipant>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub settings: Vec<Setting>,
    /// Bounded window only; older audit history is not carried
    #[serde(default)]
    pub audit_logs: Vec<AuditLog>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_order_is_reverse_of_insert_order() {
        let mut reversed = RESTORE_INSERT_ORDER;
        reversed.reverse();
        assert_eq!(RESTORE_DELETE_ORDER, reversed);
    }

    #[test]
    fn test_snapshot_fields_serialize_camel_case() {
        let snapshot = Snapshot {
            created_at: Utc::now(),
            format_version: "1".to_string(),
            collections: SnapshotCollections::default(),
        };

        let json = serde_json::to_value(&snapshot).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json.get("formatVersion").is_some());
        let collections = json.get("collections").unwrap();
        assert!(collections.get("eventParticipants").is_some());
        assert!(collections.get("auditLogs").is_some());
    }

    #[test]
    fn test_missing_version_deserializes_empty() {
        let json = r#"{"createdAt":"2024-01-15T09:30:00Z","collections":{}}"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();

        assert!(snapshot.format_version.is_empty());
        assert!(snapshot.collections.clubs.is_empty());
    }
}
