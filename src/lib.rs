//! Clubdesk service core
//!
//! This library exposes the service layer of the Clubdesk desktop
//! club-management application: members, clubs, events, notifications,
//! audit logging, settings, security helpers, and backup/restore.
//! The presentation layer lives in a separate crate and is not part
//! of this library.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod security;
pub mod services;

/// Initialize tracing with an env-filter, falling back to a sensible default.
///
/// Embedders call this once at startup; tests may call it to get log output.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clubdesk=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
