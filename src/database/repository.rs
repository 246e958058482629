//! Repository layer for database operations
//!
//! This module provides CRUD operations for all entities plus the
//! snapshot read/restore paths. The restore path is the one place that
//! touches every table and must respect dependency order.

use super::models::*;
use super::snapshot::{Snapshot, SnapshotCollections, RESTORE_DELETE_ORDER};
use crate::config;
use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Filter for audit log queries
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ===== Clubs =====

    /// Create a new club
    pub async fn create_club(&self, req: CreateClubRequest) -> Result<Club> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let club = sqlx::query_as::<_, Club>(
            r#"
            INSERT INTO clubs (id, name, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created club: {}", id);
        Ok(club)
    }

    /// Get a club by ID
    pub async fn get_club(&self, id: &str) -> Result<Club> {
        sqlx::query_as::<_, Club>("SELECT * FROM clubs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("club {}", id)))
    }

    /// List all clubs
    pub async fn list_clubs(&self) -> Result<Vec<Club>> {
        let clubs = sqlx::query_as::<_, Club>("SELECT * FROM clubs ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(clubs)
    }

    /// Update a club
    pub async fn update_club(&self, req: UpdateClubRequest) -> Result<Club> {
        let now = Utc::now();

        // Build dynamic update query
        let mut query = "UPDATE clubs SET updated_at = ?".to_string();
        let mut params: Vec<String> = vec![now.to_rfc3339()];

        if let Some(name) = &req.name {
            query.push_str(", name = ?");
            params.push(name.clone());
        }

        if let Some(description) = &req.description {
            query.push_str(", description = ?");
            params.push(description.clone());
        }

        query.push_str(" WHERE id = ?");
        params.push(req.id.clone());

        let mut q = sqlx::query(&query);
        for param in &params {
            q = q.bind(param);
        }

        let rows_affected = q.execute(&self.pool).await?.rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("club {}", req.id)));
        }

        self.get_club(&req.id).await
    }

    /// Delete a club. The service layer refuses deletion while members
    /// remain; this is the raw row removal.
    pub async fn delete_club(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM clubs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("club {}", id)));
        }

        tracing::debug!("Deleted club: {}", id);
        Ok(())
    }

    /// Count members attached to a club
    pub async fn count_club_members(&self, club_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE club_id = ?")
            .bind(club_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // ===== Users =====

    /// Create a new user. The password hash is produced by the members
    /// service; plaintext never reaches this layer.
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, club_id, email, display_name, password_hash, role, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.club_id)
        .bind(&req.email)
        .bind(&req.display_name)
        .bind(&req.password_hash)
        .bind(req.role)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created user: {}", id);
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))
    }

    /// Look up a user by email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// List users, optionally restricted to one club
    pub async fn list_users(&self, club_id: Option<&str>) -> Result<Vec<User>> {
        let users = match club_id {
            Some(club_id) => {
                sqlx::query_as::<_, User>(
                    "SELECT * FROM users WHERE club_id = ? ORDER BY display_name ASC",
                )
                .bind(club_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY display_name ASC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(users)
    }

    /// Update a user's profile
    pub async fn update_user(&self, req: UpdateUserRequest) -> Result<User> {
        let now = Utc::now();

        let mut query = "UPDATE users SET updated_at = ?".to_string();
        let mut params: Vec<Option<String>> = vec![Some(now.to_rfc3339())];

        // Outer None leaves the club untouched; Some(None) detaches.
        if let Some(club_id) = &req.club_id {
            query.push_str(", club_id = ?");
            params.push(club_id.clone());
        }

        if let Some(display_name) = &req.display_name {
            query.push_str(", display_name = ?");
            params.push(Some(display_name.clone()));
        }

        query.push_str(" WHERE id = ?");
        params.push(Some(req.id.clone()));

        let mut q = sqlx::query(&query);
        for param in &params {
            q = q.bind(param);
        }

        let rows_affected = q.execute(&self.pool).await?.rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("user {}", req.id)));
        }

        self.get_user(&req.id).await
    }

    /// Activate or deactivate a user
    pub async fn set_user_active(&self, id: &str, active: bool) -> Result<()> {
        let rows = sqlx::query("UPDATE users SET active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("user {}", id)));
        }

        tracing::debug!("Set user {} active = {}", id, active);
        Ok(())
    }

    // ===== Events =====

    /// Create an event
    pub async fn create_event(&self, req: CreateEventRequest) -> Result<Event> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (id, club_id, title, location, starts_at, ends_at, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 'scheduled', ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.club_id)
        .bind(&req.title)
        .bind(&req.location)
        .bind(req.starts_at)
        .bind(req.ends_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created event: {} for club: {}", id, req.club_id);
        Ok(event)
    }

    /// Get an event by ID
    pub async fn get_event(&self, id: &str) -> Result<Event> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {}", id)))
    }

    /// List events for a club, soonest first
    pub async fn list_events(&self, club_id: &str) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE club_id = ? ORDER BY starts_at ASC",
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Change an event's lifecycle status
    pub async fn set_event_status(&self, id: &str, status: EventStatus) -> Result<Event> {
        let rows = sqlx::query("UPDATE events SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("event {}", id)));
        }

        self.get_event(id).await
    }

    // ===== Event participants =====

    /// Register a member for an event
    pub async fn add_participant(&self, event_id: &str, user_id: &str) -> Result<EventParticipant> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let participant = sqlx::query_as::<_, EventParticipant>(
            r#"
            INSERT INTO event_participants (id, event_id, user_id, status, registered_at)
            VALUES (?, ?, ?, 'registered', ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(event_id)
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Registered user {} for event {}", user_id, event_id);
        Ok(participant)
    }

    /// Find an existing registration for an event/user pair
    pub async fn find_participant(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<EventParticipant>> {
        let participant = sqlx::query_as::<_, EventParticipant>(
            "SELECT * FROM event_participants WHERE event_id = ? AND user_id = ?",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    /// List registrations for an event
    pub async fn list_participants(&self, event_id: &str) -> Result<Vec<EventParticipant>> {
        let participants = sqlx::query_as::<_, EventParticipant>(
            "SELECT * FROM event_participants WHERE event_id = ? ORDER BY registered_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    /// Change a registration's status
    pub async fn set_participant_status(
        &self,
        id: &str,
        status: ParticipantStatus,
    ) -> Result<()> {
        let rows = sqlx::query("UPDATE event_participants SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("participant {}", id)));
        }

        Ok(())
    }

    // ===== Reports =====

    /// Store a report
    pub async fn create_report(&self, req: CreateReportRequest) -> Result<Report> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (id, club_id, title, content, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.club_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.created_by)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created report: {}", id);
        Ok(report)
    }

    /// Get a report by ID
    pub async fn get_report(&self, id: &str) -> Result<Report> {
        sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("report {}", id)))
    }

    /// List reports, optionally restricted to one club
    pub async fn list_reports(&self, club_id: Option<&str>) -> Result<Vec<Report>> {
        let reports = match club_id {
            Some(club_id) => {
                sqlx::query_as::<_, Report>(
                    "SELECT * FROM reports WHERE club_id = ? ORDER BY created_at DESC",
                )
                .bind(club_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Report>("SELECT * FROM reports ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(reports)
    }

    /// Delete a report
    pub async fn delete_report(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("report {}", id)));
        }

        Ok(())
    }

    // ===== Settings =====

    /// Get a setting value within a scope
    pub async fn get_setting(&self, scope: &str, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE scope = ? AND key = ?")
                .bind(scope)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Upsert a setting value within a scope
    pub async fn set_setting(&self, scope: &str, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (scope, key, value) VALUES (?, ?, ?)
            ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(scope)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Set setting: {}/{} = {}", scope, key, value);
        Ok(())
    }

    /// Remove a setting
    pub async fn delete_setting(&self, scope: &str, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE scope = ? AND key = ?")
            .bind(scope)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// List every setting within a scope
    pub async fn list_settings(&self, scope: &str) -> Result<Vec<Setting>> {
        let settings =
            sqlx::query_as::<_, Setting>("SELECT * FROM settings WHERE scope = ? ORDER BY key ASC")
                .bind(scope)
                .fetch_all(&self.pool)
                .await?;

        Ok(settings)
    }

    // ===== Audit logs =====

    /// Append an audit log entry
    pub async fn insert_audit_log(
        &self,
        user_id: Option<&str>,
        action: &str,
        detail: &str,
    ) -> Result<AuditLog> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let entry = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (id, timestamp, user_id, action, detail)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(now)
        .bind(user_id)
        .bind(action)
        .bind(detail)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Query audit logs with optional filters, newest first
    pub async fn list_audit_logs(&self, filter: AuditFilter) -> Result<Vec<AuditLog>> {
        let mut query = "SELECT * FROM audit_logs WHERE 1 = 1".to_string();

        if filter.since.is_some() {
            query.push_str(" AND timestamp >= ?");
        }
        if filter.until.is_some() {
            query.push_str(" AND timestamp <= ?");
        }
        if filter.user_id.is_some() {
            query.push_str(" AND user_id = ?");
        }
        query.push_str(" ORDER BY timestamp DESC");
        if filter.limit.is_some() {
            query.push_str(" LIMIT ?");
        }

        let mut q = sqlx::query_as::<_, AuditLog>(&query);
        if let Some(since) = filter.since {
            q = q.bind(since);
        }
        if let Some(until) = filter.until {
            q = q.bind(until);
        }
        if let Some(user_id) = &filter.user_id {
            q = q.bind(user_id);
        }
        if let Some(limit) = filter.limit {
            q = q.bind(limit);
        }

        let logs = q.fetch_all(&self.pool).await?;
        Ok(logs)
    }

    /// Delete audit entries older than the cutoff; returns rows removed
    pub async fn purge_audit_logs_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let rows = sqlx::query("DELETE FROM audit_logs WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows)
    }

    // ===== Email outbox =====

    /// Queue an email for delivery
    pub async fn queue_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<EmailMessage> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let message = sqlx::query_as::<_, EmailMessage>(
            r#"
            INSERT INTO emails (id, recipient, subject, body, status, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(recipient)
        .bind(subject)
        .bind(body)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Queued email {} to {}", id, recipient);
        Ok(message)
    }

    /// List messages waiting for delivery, oldest first
    pub async fn list_pending_emails(&self) -> Result<Vec<EmailMessage>> {
        let messages = sqlx::query_as::<_, EmailMessage>(
            "SELECT * FROM emails WHERE status = 'pending' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Mark a message delivered
    pub async fn mark_email_sent(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE emails SET status = 'sent', sent_at = ?, last_error = NULL WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Fetch one outbox message by ID
    pub async fn get_email(&self, id: &str) -> Result<EmailMessage> {
        sqlx::query_as::<_, EmailMessage>("SELECT * FROM emails WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("email {}", id)))
    }

    /// Mark a message failed, recording the delivery error
    pub async fn mark_email_failed(&self, id: &str, error: &str) -> Result<()> {
        sqlx::query("UPDATE emails SET status = 'failed', last_error = ? WHERE id = ?")
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ===== Snapshots =====

    /// Read every collection for a snapshot. Audit logs are bounded to
    /// the capture window; everything else is read in full. Any read
    /// error aborts the whole capture.
    pub async fn load_snapshot_collections(&self) -> Result<SnapshotCollections> {
        let audit_cutoff = Utc::now() - Duration::days(config::AUDIT_SNAPSHOT_WINDOW_DAYS);

        let clubs = sqlx::query_as::<_, Club>("SELECT * FROM clubs")
            .fetch_all(&self.pool)
            .await?;
        let users = sqlx::query_as::<_, User>("SELECT * FROM users")
            .fetch_all(&self.pool)
            .await?;
        let events = sqlx::query_as::<_, Event>("SELECT * FROM events")
            .fetch_all(&self.pool)
            .await?;
        let event_participants =
            sqlx::query_as::<_, EventParticipant>("SELECT * FROM event_participants")
                .fetch_all(&self.pool)
                .await?;
        let reports = sqlx::query_as::<_, Report>("SELECT * FROM reports")
            .fetch_all(&self.pool)
            .await?;
        let settings = sqlx::query_as::<_, Setting>("SELECT * FROM settings")
            .fetch_all(&self.pool)
            .await?;
        let audit_logs =
            sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_logs WHERE timestamp >= ?")
                .bind(audit_cutoff)
                .fetch_all(&self.pool)
                .await?;

        Ok(SnapshotCollections {
            clubs,
            users,
            events,
            event_participants,
            reports,
            settings,
            audit_logs,
        })
    }

    /// Replace the entire store with the snapshot's contents.
    ///
    /// Runs as one transaction: deletes children-before-parents, inserts
    /// parents-before-children with original primary keys preserved, then
    /// commits. Any failure rolls the whole transaction back and surfaces
    /// as a single wrapped restore error.
    pub async fn restore_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        match self.restore_snapshot_inner(snapshot).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!("Snapshot restore failed, transaction rolled back: {}", e);
                Err(AppError::Restore(format!("restore failed: {}", e)))
            }
        }
    }

    async fn restore_snapshot_inner(&self, snapshot: &Snapshot) -> Result<()> {
        let collections = &snapshot.collections;
        let mut tx = self.pool.begin().await?;

        // Clear children before parents, or foreign keys fire
        for table in RESTORE_DELETE_ORDER {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        // Repopulate parents before children. Each table's inserts have
        // executed before the next table begins, so child foreign keys
        // resolve against the rows just written.
        for club in &collections.clubs {
            sqlx::query(
                "INSERT INTO clubs (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&club.id)
            .bind(&club.name)
            .bind(&club.description)
            .bind(club.created_at)
            .bind(club.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for user in &collections.users {
            sqlx::query(
                r#"
                INSERT INTO users (id, club_id, email, display_name, password_hash, role, active, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.id)
            .bind(&user.club_id)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.active)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for event in &collections.events {
            sqlx::query(
                r#"
                INSERT INTO events (id, club_id, title, location, starts_at, ends_at, status, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&event.id)
            .bind(&event.club_id)
            .bind(&event.title)
            .bind(&event.location)
            .bind(event.starts_at)
            .bind(event.ends_at)
            .bind(event.status)
            .bind(event.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for participant in &collections.event_participants {
            sqlx::query(
                r#"
                INSERT INTO event_participants (id, event_id, user_id, status, registered_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&participant.id)
            .bind(&participant.event_id)
            .bind(&participant.user_id)
            .bind(participant.status)
            .bind(participant.registered_at)
            .execute(&mut *tx)
            .await?;
        }

        for report in &collections.reports {
            sqlx::query(
                r#"
                INSERT INTO reports (id, club_id, title, content, created_by, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&report.id)
            .bind(&report.club_id)
            .bind(&report.title)
            .bind(&report.content)
            .bind(&report.created_by)
            .bind(report.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for setting in &collections.settings {
            sqlx::query("INSERT INTO settings (scope, key, value) VALUES (?, ?, ?)")
                .bind(&setting.scope)
                .bind(&setting.key)
                .bind(&setting.value)
                .execute(&mut *tx)
                .await?;
        }

        for entry in &collections.audit_logs {
            sqlx::query(
                "INSERT INTO audit_logs (id, timestamp, user_id, action, detail) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&entry.id)
            .bind(entry.timestamp)
            .bind(&entry.user_id)
            .bind(&entry.action)
            .bind(&entry.detail)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Restored snapshot: {} clubs, {} users, {} events, {} participants",
            collections.clubs.len(),
            collections.users.len(),
            collections.events.len(),
            collections.event_participants.len()
        );

        Ok(())
    }

    /// Row count for one table; used by restore verification
    pub async fn count_rows(&self, table: &str) -> Result<i64> {
        // Restrict to known tables so this never interpolates arbitrary input
        if !RESTORE_DELETE_ORDER.contains(&table) && table != "emails" {
            return Err(AppError::Validation(format!("unknown table {}", table)));
        }

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
