//! Clubs service
//!
//! Club administration: create, update, list, delete. Deletion is
//! refused while members remain attached. Mutations are audit-logged.

use crate::database::{Club, CreateClubRequest, Repository, UpdateClubRequest};
use crate::error::{AppError, Result};
use crate::security::SessionContext;

use super::audit::AuditService;

/// Service for club administration
#[derive(Clone)]
pub struct ClubsService {
    repo: Repository,
    audit: AuditService,
}

impl ClubsService {
    pub fn new(repo: Repository, audit: AuditService) -> Self {
        Self { repo, audit }
    }

    /// Create a new club
    pub async fn create_club(&self, ctx: &SessionContext, req: CreateClubRequest) -> Result<Club> {
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("club name must not be empty".to_string()));
        }

        tracing::info!("Creating club: {}", req.name);
        let club = self.repo.create_club(req).await?;

        self.audit
            .record(ctx, "club.created", &format!("{} ({})", club.name, club.id))
            .await?;

        Ok(club)
    }

    /// Get a club by ID
    pub async fn get_club(&self, id: &str) -> Result<Club> {
        self.repo.get_club(id).await
    }

    /// List all clubs
    pub async fn list_clubs(&self) -> Result<Vec<Club>> {
        self.repo.list_clubs().await
    }

    /// Update a club's name or description
    pub async fn update_club(&self, ctx: &SessionContext, req: UpdateClubRequest) -> Result<Club> {
        let club = self.repo.update_club(req).await?;

        self.audit
            .record(ctx, "club.updated", &format!("{} ({})", club.name, club.id))
            .await?;

        Ok(club)
    }

    /// Delete a club. Refused while members remain so nobody is left
    /// pointing at a missing club.
    pub async fn delete_club(&self, ctx: &SessionContext, id: &str) -> Result<()> {
        let club = self.repo.get_club(id).await?;

        let members = self.repo.count_club_members(id).await?;
        if members > 0 {
            return Err(AppError::Conflict(format!(
                "club {} still has {} members",
                id, members
            )));
        }

        self.repo.delete_club(id).await?;

        self.audit
            .record(ctx, "club.deleted", &format!("{} ({})", club.name, id))
            .await?;

        tracing::info!("Deleted club: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, CreateUserRequest, UserRole};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> (ClubsService, Repository) {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let audit = AuditService::new(repo.clone());
        (ClubsService::new(repo.clone(), audit), repo)
    }

    #[tokio::test]
    async fn test_create_club_records_audit() {
        let (service, repo) = create_test_service().await;
        let ctx = SessionContext::for_user("u1", "admin@example.com");

        let club = service
            .create_club(
                &ctx,
                CreateClubRequest {
                    name: "Chess Club".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(club.name, "Chess Club");

        let logs = repo
            .list_audit_logs(Default::default())
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "club.created");
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let (service, _repo) = create_test_service().await;

        let result = service
            .create_club(
                &SessionContext::system(),
                CreateClubRequest {
                    name: "   ".to_string(),
                    description: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_refused_with_members() {
        let (service, repo) = create_test_service().await;
        let ctx = SessionContext::system();

        let club = service
            .create_club(
                &ctx,
                CreateClubRequest {
                    name: "Club".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        repo.create_user(CreateUserRequest {
            club_id: Some(club.id.clone()),
            email: "m@example.com".to_string(),
            display_name: "Member".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            role: UserRole::Member,
        })
        .await
        .unwrap();

        let result = service.delete_club(&ctx, &club.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // Club still there
        assert!(service.get_club(&club.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_empty_club() {
        let (service, _repo) = create_test_service().await;
        let ctx = SessionContext::system();

        let club = service
            .create_club(
                &ctx,
                CreateClubRequest {
                    name: "Short-lived".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        service.delete_club(&ctx, &club.id).await.unwrap();
        assert!(service.get_club(&club.id).await.is_err());
    }
}
