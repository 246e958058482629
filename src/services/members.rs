//! Members service
//!
//! Member registration, authentication, profile updates, and
//! deactivation. Registration hashes the password before anything is
//! stored, queues a welcome email, and records an audit event.

use crate::config;
use crate::database::{CreateUserRequest, Repository, UpdateUserRequest, User, UserRole};
use crate::error::{AppError, Result};
use crate::security::{self, SessionContext, SessionStore};

use super::audit::AuditService;
use super::notifications::NotificationService;

/// Input for member registration
#[derive(Debug)]
pub struct RegisterMemberRequest {
    pub club_id: Option<String>,
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub role: UserRole,
}

/// An authenticated member plus their session token
#[derive(Debug, Clone)]
pub struct AuthenticatedMember {
    pub user: User,
    pub token: String,
    pub ctx: SessionContext,
}

/// Service for member management
#[derive(Clone)]
pub struct MembersService {
    repo: Repository,
    audit: AuditService,
    notifications: NotificationService,
    sessions: SessionStore,
}

impl MembersService {
    pub fn new(
        repo: Repository,
        audit: AuditService,
        notifications: NotificationService,
        sessions: SessionStore,
    ) -> Self {
        Self {
            repo,
            audit,
            notifications,
            sessions,
        }
    }

    /// Register a new member
    pub async fn register(
        &self,
        ctx: &SessionContext,
        req: RegisterMemberRequest,
    ) -> Result<User> {
        if !req.email.contains('@') {
            return Err(AppError::Validation(format!(
                "invalid email address: {}",
                req.email
            )));
        }
        if req.password.len() < config::MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                config::MIN_PASSWORD_LENGTH
            )));
        }
        if req.display_name.trim().is_empty()
            || req.display_name.len() > config::MAX_DISPLAY_NAME_LENGTH
        {
            return Err(AppError::Validation("invalid display name".to_string()));
        }

        if self.repo.find_user_by_email(&req.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "email already registered: {}",
                req.email
            )));
        }

        let password_hash = security::hash_password(&req.password)?;

        let user = self
            .repo
            .create_user(CreateUserRequest {
                club_id: req.club_id,
                email: req.email,
                display_name: req.display_name,
                password_hash,
                role: req.role,
            })
            .await?;

        tracing::info!("Registered member: {}", user.id);

        self.audit
            .record(ctx, "member.registered", &format!("{} ({})", user.email, user.id))
            .await?;

        self.notifications
            .queue_email(
                &user.email,
                "Welcome to the club",
                &format!("Hello {}, your membership is active.", user.display_name),
            )
            .await?;

        Ok(user)
    }

    /// Authenticate with email and password, issuing a session token
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthenticatedMember> {
        let user = self
            .repo
            .find_user_by_email(email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.active {
            tracing::warn!("Login attempt for deactivated member: {}", user.id);
            return Err(AppError::Unauthorized);
        }

        if !security::verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        let token = self.sessions.create(&user.id).await?;
        let ctx = SessionContext::for_user(user.id.clone(), user.email.clone());

        tracing::info!("Member authenticated: {}", user.id);

        Ok(AuthenticatedMember { user, token, ctx })
    }

    /// End a session
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.revoke(token).await
    }

    /// Get a member by ID
    pub async fn get_member(&self, id: &str) -> Result<User> {
        self.repo.get_user(id).await
    }

    /// List members, optionally restricted to one club
    pub async fn list_members(&self, club_id: Option<&str>) -> Result<Vec<User>> {
        self.repo.list_users(club_id).await
    }

    /// Update a member's profile
    pub async fn update_member(
        &self,
        ctx: &SessionContext,
        req: UpdateUserRequest,
    ) -> Result<User> {
        let user = self.repo.update_user(req).await?;

        self.audit
            .record(ctx, "member.updated", &format!("{} ({})", user.email, user.id))
            .await?;

        Ok(user)
    }

    /// Deactivate a member; their sessions stop working on next lookup
    pub async fn deactivate_member(&self, ctx: &SessionContext, id: &str) -> Result<()> {
        let user = self.repo.get_user(id).await?;
        self.repo.set_user_active(id, false).await?;

        self.audit
            .record(ctx, "member.deactivated", &format!("{} ({})", user.email, id))
            .await?;

        tracing::info!("Deactivated member: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    async fn create_test_service() -> (MembersService, Repository, TempDir) {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let temp = TempDir::new().unwrap();
        let repo = Repository::new(pool);
        let audit = AuditService::new(repo.clone());
        let notifications = NotificationService::new(repo.clone());
        let sessions = SessionStore::new(temp.path().to_path_buf());

        (
            MembersService::new(repo.clone(), audit, notifications, sessions),
            repo,
            temp,
        )
    }

    fn register_request(email: &str) -> RegisterMemberRequest {
        RegisterMemberRequest {
            club_id: None,
            email: email.to_string(),
            display_name: "Alex".to_string(),
            password: "hunter2hunter2".to_string(),
            role: UserRole::Member,
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password_and_queues_welcome() {
        let (service, repo, _temp) = create_test_service().await;

        let user = service
            .register(&SessionContext::system(), register_request("a@example.com"))
            .await
            .unwrap();

        // Stored hash is Argon2, never the plaintext
        assert!(user.password_hash.starts_with("$argon2"));
        assert_ne!(user.password_hash, "hunter2hunter2");

        // Welcome email queued
        let pending = repo.list_pending_emails().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].recipient, "a@example.com");
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (service, _repo, _temp) = create_test_service().await;
        let ctx = SessionContext::system();

        let bad_email = register_request("not-an-email");
        assert!(service.register(&ctx, bad_email).await.is_err());

        let mut short_password = register_request("ok@example.com");
        short_password.password = "short".to_string();
        assert!(service.register(&ctx, short_password).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflict() {
        let (service, _repo, _temp) = create_test_service().await;
        let ctx = SessionContext::system();

        service
            .register(&ctx, register_request("dup@example.com"))
            .await
            .unwrap();

        let result = service.register(&ctx, register_request("dup@example.com")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_authenticate_and_logout() {
        let (service, _repo, _temp) = create_test_service().await;

        service
            .register(&SessionContext::system(), register_request("m@example.com"))
            .await
            .unwrap();

        let auth = service
            .authenticate("m@example.com", "hunter2hunter2")
            .await
            .unwrap();

        assert_eq!(auth.user.email, "m@example.com");
        assert_eq!(auth.ctx.user_id.as_deref(), Some(auth.user.id.as_str()));
        assert!(!auth.token.is_empty());

        service.logout(&auth.token).await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (service, _repo, _temp) = create_test_service().await;

        service
            .register(&SessionContext::system(), register_request("m@example.com"))
            .await
            .unwrap();

        let result = service.authenticate("m@example.com", "wrong-password").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));

        let result = service.authenticate("nobody@example.com", "whatever").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_deactivated_member_cannot_authenticate() {
        let (service, _repo, _temp) = create_test_service().await;
        let ctx = SessionContext::system();

        let user = service
            .register(&ctx, register_request("m@example.com"))
            .await
            .unwrap();

        service.deactivate_member(&ctx, &user.id).await.unwrap();

        let result = service.authenticate("m@example.com", "hunter2hunter2").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
