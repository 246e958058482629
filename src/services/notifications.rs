//! Notifications service
//!
//! Email notifications go through a database outbox: callers queue
//! messages, and `process_outbox` drains pending ones through a
//! `Mailer`. Delivery failures are recorded per message and never stop
//! the rest of the batch.

use crate::database::{EmailMessage, ParticipantStatus, Repository};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Delivery seam. The shipped implementation writes files; tests use a
/// recording fake.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Mailer that drops each message as a text file into an outbox
/// directory, where a desktop mail client integration picks it up.
pub struct FileMailer {
    outbox_dir: PathBuf,
}

impl FileMailer {
    pub fn new(outbox_dir: PathBuf) -> Self {
        Self { outbox_dir }
    }
}

#[async_trait]
impl Mailer for FileMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        fs::create_dir_all(&self.outbox_dir).await?;

        let content = format!(
            "To: {}\nSubject: {}\n\n{}\n",
            message.recipient, message.subject, message.body
        );

        let path = self.outbox_dir.join(format!("{}.eml", message.id));
        fs::write(&path, content).await?;

        tracing::debug!("Wrote outgoing email to {:?}", path);
        Ok(())
    }
}

/// Outcome of one outbox run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OutboxReport {
    pub sent: usize,
    pub failed: usize,
}

/// Service for queuing and delivering notifications
#[derive(Clone)]
pub struct NotificationService {
    repo: Repository,
}

impl NotificationService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Queue one email for delivery
    pub async fn queue_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<EmailMessage> {
        if recipient.trim().is_empty() || !recipient.contains('@') {
            return Err(AppError::Validation(format!(
                "invalid recipient address: {}",
                recipient
            )));
        }

        self.repo.queue_email(recipient, subject, body).await
    }

    /// Queue one message per registered participant of an event.
    /// Members who withdrew their registration are not contacted.
    pub async fn notify_event_participants(
        &self,
        event_id: &str,
        subject: &str,
        body: &str,
    ) -> Result<usize> {
        let participants = self.repo.list_participants(event_id).await?;
        let mut queued = 0;

        for participant in &participants {
            if participant.status == ParticipantStatus::Cancelled {
                continue;
            }

            let user = self.repo.get_user(&participant.user_id).await?;
            self.repo.queue_email(&user.email, subject, body).await?;
            queued += 1;
        }

        tracing::info!("Queued {} notifications for event {}", queued, event_id);
        Ok(queued)
    }

    /// Deliver every pending message. One bad message is marked failed
    /// and does not abort the rest of the batch.
    pub async fn process_outbox(&self, mailer: &dyn Mailer) -> Result<OutboxReport> {
        let pending = self.repo.list_pending_emails().await?;
        let mut report = OutboxReport::default();

        for message in &pending {
            match mailer.send(message).await {
                Ok(()) => {
                    self.repo.mark_email_sent(&message.id).await?;
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to send email {}: {}", message.id, e);
                    self.repo.mark_email_failed(&message.id, &e.to_string()).await?;
                    report.failed += 1;
                }
            }
        }

        if report.sent + report.failed > 0 {
            tracing::info!("Outbox run: {} sent, {} failed", report.sent, report.failed);
        }

        Ok(report)
    }
}
