//! Events service
//!
//! Event administration and participant registration. Cancelling an
//! event notifies every registered participant through the email
//! outbox.

use crate::database::{
    CreateEventRequest, Event, EventParticipant, EventStatus, ParticipantStatus, Repository,
};
use crate::error::{AppError, Result};
use crate::security::SessionContext;

use super::audit::AuditService;
use super::notifications::NotificationService;

/// Service for event administration
#[derive(Clone)]
pub struct EventsService {
    repo: Repository,
    audit: AuditService,
    notifications: NotificationService,
}

impl EventsService {
    pub fn new(repo: Repository, audit: AuditService, notifications: NotificationService) -> Self {
        Self {
            repo,
            audit,
            notifications,
        }
    }

    /// Create a new event for a club
    pub async fn create_event(&self, ctx: &SessionContext, req: CreateEventRequest) -> Result<Event> {
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("event title must not be empty".to_string()));
        }
        if let Some(ends_at) = req.ends_at {
            if ends_at < req.starts_at {
                return Err(AppError::Validation(
                    "event cannot end before it starts".to_string(),
                ));
            }
        }

        // Surface a not-found error rather than a bare FK violation
        self.repo.get_club(&req.club_id).await?;

        let event = self.repo.create_event(req).await?;

        self.audit
            .record(ctx, "event.created", &format!("{} ({})", event.title, event.id))
            .await?;

        Ok(event)
    }

    /// Get an event by ID
    pub async fn get_event(&self, id: &str) -> Result<Event> {
        self.repo.get_event(id).await
    }

    /// List a club's events
    pub async fn list_events(&self, club_id: &str) -> Result<Vec<Event>> {
        self.repo.list_events(club_id).await
    }

    /// Cancel an event and notify registered participants
    pub async fn cancel_event(&self, ctx: &SessionContext, id: &str) -> Result<Event> {
        let event = self.repo.get_event(id).await?;

        if event.status == EventStatus::Cancelled {
            return Err(AppError::Conflict(format!("event {} already cancelled", id)));
        }

        let event = self.repo.set_event_status(id, EventStatus::Cancelled).await?;

        self.audit
            .record(ctx, "event.cancelled", &format!("{} ({})", event.title, id))
            .await?;

        self.notifications
            .notify_event_participants(
                id,
                &format!("Cancelled: {}", event.title),
                "The event has been cancelled. We apologise for the short notice.",
            )
            .await?;

        tracing::info!("Cancelled event: {}", id);
        Ok(event)
    }

    /// Mark a scheduled event completed
    pub async fn complete_event(&self, ctx: &SessionContext, id: &str) -> Result<Event> {
        let event = self.repo.get_event(id).await?;

        if event.status != EventStatus::Scheduled {
            return Err(AppError::Conflict(format!("event {} is not scheduled", id)));
        }

        let event = self.repo.set_event_status(id, EventStatus::Completed).await?;

        self.audit
            .record(ctx, "event.completed", &format!("{} ({})", event.title, id))
            .await?;

        Ok(event)
    }

    /// Register a member for an event
    pub async fn register_participant(
        &self,
        ctx: &SessionContext,
        event_id: &str,
        user_id: &str,
    ) -> Result<EventParticipant> {
        let event = self.repo.get_event(event_id).await?;
        if event.status == EventStatus::Cancelled {
            return Err(AppError::Conflict(format!(
                "event {} is cancelled",
                event_id
            )));
        }

        let user = self.repo.get_user(user_id).await?;
        if !user.active {
            return Err(AppError::Validation(format!(
                "member {} is deactivated",
                user_id
            )));
        }

        if self.repo.find_participant(event_id, user_id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "member {} already registered for event {}",
                user_id, event_id
            )));
        }

        let participant = self.repo.add_participant(event_id, user_id).await?;

        self.audit
            .record(
                ctx,
                "event.participant_registered",
                &format!("{} -> {}", user_id, event_id),
            )
            .await?;

        Ok(participant)
    }

    /// Cancel a member's registration
    pub async fn cancel_participation(
        &self,
        ctx: &SessionContext,
        event_id: &str,
        user_id: &str,
    ) -> Result<()> {
        let participant = self
            .repo
            .find_participant(event_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "registration for member {} on event {}",
                    user_id, event_id
                ))
            })?;

        self.repo
            .set_participant_status(&participant.id, ParticipantStatus::Cancelled)
            .await?;

        self.audit
            .record(
                ctx,
                "event.participant_cancelled",
                &format!("{} -> {}", user_id, event_id),
            )
            .await?;

        Ok(())
    }

    /// List registrations for an event
    pub async fn list_participants(&self, event_id: &str) -> Result<Vec<EventParticipant>> {
        self.repo.list_participants(event_id).await
    }
}
