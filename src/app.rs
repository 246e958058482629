//! Application state and initialization
//!
//! This module wires the repository and all services together. The
//! presentation layer holds one AppState and calls services through it.

use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::security::SessionStore;
use crate::services::{
    AuditService, BackupService, ClubsService, EventsService, MembersService,
    NotificationService, ReportsService, SettingsService,
};
use std::path::PathBuf;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub repo: Repository,
    pub audit: AuditService,
    pub settings: SettingsService,
    pub notifications: NotificationService,
    pub members: MembersService,
    pub clubs: ClubsService,
    pub events: EventsService,
    pub reports: ReportsService,
    pub backup: BackupService,
}

impl AppState {
    /// Initialize the service core under the given data directory.
    ///
    /// Creates the directory layout, opens the database pool, and wires
    /// every service. Called once at startup.
    pub async fn initialize(data_dir: PathBuf) -> Result<Self> {
        tracing::info!("Initializing application, data dir: {:?}", data_dir);

        std::fs::create_dir_all(&data_dir)?;
        std::fs::create_dir_all(data_dir.join("backups"))?;

        let pool = create_pool(&data_dir.join("clubdesk.sqlite")).await?;
        let repo = Repository::new(pool);

        let audit = AuditService::new(repo.clone());
        let settings = SettingsService::new(repo.clone());
        let notifications = NotificationService::new(repo.clone());
        let sessions = SessionStore::new(data_dir.clone());

        let members = MembersService::new(
            repo.clone(),
            audit.clone(),
            notifications.clone(),
            sessions,
        );
        let clubs = ClubsService::new(repo.clone(), audit.clone());
        let events = EventsService::new(repo.clone(), audit.clone(), notifications.clone());
        let reports = ReportsService::new(repo.clone(), audit.clone());
        let backup = BackupService::new(
            repo.clone(),
            audit.clone(),
            settings.clone(),
            data_dir.join("backups"),
        );

        tracing::info!("Application initialized successfully");

        Ok(Self {
            data_dir,
            repo,
            audit,
            settings,
            notifications,
            members,
            clubs,
            events,
            reports,
            backup,
        })
    }
}
