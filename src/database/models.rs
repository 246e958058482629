//! Database models
//!
//! Rust structs representing database entities. All models use serde
//! for serialization; snapshot documents carry lowerCamelCase field
//! names, so every entity renames its fields accordingly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A club that members and events belong to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role of a member within the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Member,
}

/// A registered member
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Club the member belongs to; members may be unaffiliated
    pub club_id: Option<String>,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EventStatus {
    Scheduled,
    Cancelled,
    Completed,
}

/// A club event
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub club_id: String,
    pub title: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

/// Status of a member's event registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Registered,
    Confirmed,
    Cancelled,
}

/// A member's registration for an event
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventParticipant {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub status: ParticipantStatus,
    pub registered_at: DateTime<Utc>,
}

/// A stored report. References to clubs and authors are loose: reports
/// outlive both, so neither column carries a foreign key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub club_id: Option<String>,
    pub title: String,
    pub content: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A scoped key/value setting. Scope is `"app"` for global settings or
/// an entity scope such as `"club:<id>"`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub scope: String,
    pub key: String,
    pub value: String,
}

/// One audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<String>,
    pub action: String,
    pub detail: String,
}

/// Delivery status of an outbox message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

/// A queued notification email. The outbox is operational state and is
/// not captured in snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Create club request
#[derive(Debug, Deserialize)]
pub struct CreateClubRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Update club request
#[derive(Debug, Deserialize)]
pub struct UpdateClubRequest {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Create user request; the password is hashed before it reaches the
/// repository layer.
#[derive(Debug)]
pub struct CreateUserRequest {
    pub club_id: Option<String>,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Update user profile request. The outer `Option` on `club_id` means
/// "leave unchanged"; `Some(None)` detaches the member from their club.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub id: String,
    #[serde(default)]
    pub club_id: Option<Option<String>>,
    pub display_name: Option<String>,
}

/// Create event request
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub club_id: String,
    pub title: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Create report request
#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub club_id: Option<String>,
    pub title: String,
    pub content: String,
    pub created_by: Option<String>,
}
