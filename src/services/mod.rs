//! Services module
//!
//! Business logic services that coordinate between callers and the
//! repository, and call out to one another (email, audit) sequentially.

pub mod audit;
pub mod backup;
pub mod clubs;
pub mod events;
pub mod members;
pub mod notifications;
pub mod reports;
pub mod settings;

pub use audit::AuditService;
pub use backup::{BackupInfo, BackupService};
pub use clubs::ClubsService;
pub use events::EventsService;
pub use members::MembersService;
pub use notifications::{FileMailer, Mailer, NotificationService};
pub use reports::ReportsService;
pub use settings::SettingsService;
