//! Reports service
//!
//! Storage and retrieval of club reports. Content generation happens in
//! the presentation layer; this service only persists what it is given.

use crate::database::{CreateReportRequest, Report, Repository};
use crate::error::{AppError, Result};
use crate::security::SessionContext;

use super::audit::AuditService;

/// Service for report storage
#[derive(Clone)]
pub struct ReportsService {
    repo: Repository,
    audit: AuditService,
}

impl ReportsService {
    pub fn new(repo: Repository, audit: AuditService) -> Self {
        Self { repo, audit }
    }

    /// Store a report
    pub async fn create_report(
        &self,
        ctx: &SessionContext,
        mut req: CreateReportRequest,
    ) -> Result<Report> {
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("report title must not be empty".to_string()));
        }

        // Stamp authorship from the caller when not supplied
        if req.created_by.is_none() {
            req.created_by = ctx.user_id.clone();
        }

        let report = self.repo.create_report(req).await?;

        self.audit
            .record(ctx, "report.created", &format!("{} ({})", report.title, report.id))
            .await?;

        Ok(report)
    }

    /// Get a report by ID
    pub async fn get_report(&self, id: &str) -> Result<Report> {
        self.repo.get_report(id).await
    }

    /// List reports, optionally restricted to one club
    pub async fn list_reports(&self, club_id: Option<&str>) -> Result<Vec<Report>> {
        self.repo.list_reports(club_id).await
    }

    /// Delete a report
    pub async fn delete_report(&self, ctx: &SessionContext, id: &str) -> Result<()> {
        let report = self.repo.get_report(id).await?;
        self.repo.delete_report(id).await?;

        self.audit
            .record(ctx, "report.deleted", &format!("{} ({})", report.title, id))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> ReportsService {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let audit = AuditService::new(repo.clone());
        ReportsService::new(repo, audit)
    }

    #[tokio::test]
    async fn test_create_stamps_author_from_context() {
        let service = create_test_service().await;
        let ctx = SessionContext::for_user("author-1", "a@example.com");

        let report = service
            .create_report(
                &ctx,
                CreateReportRequest {
                    club_id: None,
                    title: "Quarterly summary".to_string(),
                    content: "All good.".to_string(),
                    created_by: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(report.created_by.as_deref(), Some("author-1"));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let service = create_test_service().await;
        let ctx = SessionContext::system();

        let report = service
            .create_report(
                &ctx,
                CreateReportRequest {
                    club_id: Some("club-1".to_string()),
                    title: "Minutes".to_string(),
                    content: "...".to_string(),
                    created_by: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(service.list_reports(Some("club-1")).await.unwrap().len(), 1);
        assert_eq!(service.list_reports(Some("club-2")).await.unwrap().len(), 0);

        service.delete_report(&ctx, &report.id).await.unwrap();
        assert!(service.get_report(&report.id).await.is_err());
    }
}
