//! Audit service
//!
//! Records who did what and when. Mutating services call in here after
//! their own work succeeds; maintenance paths that must not fail on
//! audit problems use the best-effort variant.

use crate::database::repository::AuditFilter;
use crate::database::{AuditLog, Repository};
use crate::error::Result;
use crate::security::SessionContext;
use chrono::{Duration, Utc};

/// Service for the audit trail
#[derive(Clone)]
pub struct AuditService {
    repo: Repository,
}

impl AuditService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Record an audit event
    pub async fn record(
        &self,
        ctx: &SessionContext,
        action: &str,
        detail: &str,
    ) -> Result<AuditLog> {
        self.repo
            .insert_audit_log(ctx.user_id.as_deref(), action, detail)
            .await
    }

    /// Record an audit event, logging instead of failing. Used after a
    /// commit has already happened and the caller's work must stand.
    pub async fn record_best_effort(&self, ctx: &SessionContext, action: &str, detail: &str) {
        if let Err(e) = self.record(ctx, action, detail).await {
            tracing::warn!("Failed to record audit event {}: {}", action, e);
        }
    }

    /// Query the trail, newest first
    pub async fn list(&self, filter: AuditFilter) -> Result<Vec<AuditLog>> {
        self.repo.list_audit_logs(filter).await
    }

    /// Delete entries older than the given number of days
    pub async fn purge_older_than(&self, days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(days);
        let removed = self.repo.purge_audit_logs_before(cutoff).await?;

        tracing::info!("Purged {} audit entries older than {} days", removed, days);
        Ok(removed)
    }
}
