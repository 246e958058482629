//! Security helpers
//!
//! Argon2id password hashing, random session tokens, and flat-file
//! session bookkeeping. Sessions live in a JSON side file so the
//! presentation layer can resume them across launches.

use crate::config;
use crate::error::{AppError, Result};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;

/// Hash a password with Argon2id and a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Generic(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Generic(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Generate a random 256-bit session token, hex-encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Identity passed explicitly to service calls that need to know who is
/// acting. Replaces any notion of a global "current user".
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl SessionContext {
    /// Context for maintenance operations not tied to a member
    pub fn system() -> Self {
        Self {
            user_id: None,
            email: None,
        }
    }

    pub fn for_user(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            email: Some(email.into()),
        }
    }
}

/// One persisted session record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Flat-file session store, keyed by token
#[derive(Clone)]
pub struct SessionStore {
    sessions_path: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            sessions_path: data_dir.join(config::SESSION_FILE),
        }
    }

    /// Create a session for a user and persist it; returns the token
    pub async fn create(&self, user_id: &str) -> Result<String> {
        let token = generate_token();
        let now = Utc::now();

        let mut sessions = self.load().await?;
        sessions.insert(
            token.clone(),
            SessionRecord {
                user_id: user_id.to_string(),
                created_at: now,
                expires_at: now + Duration::hours(config::SESSION_LIFETIME_HOURS),
            },
        );
        self.save(&sessions).await?;

        tracing::info!("Created session for user {}", user_id);
        Ok(token)
    }

    /// Look up a session; expired tokens are treated as absent
    pub async fn lookup(&self, token: &str) -> Result<Option<SessionRecord>> {
        let sessions = self.load().await?;

        match sessions.get(token) {
            Some(record) if record.expires_at > Utc::now() => Ok(Some(record.clone())),
            Some(_) => {
                tracing::debug!("Rejected expired session token");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Remove a session
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let mut sessions = self.load().await?;

        if sessions.remove(token).is_some() {
            self.save(&sessions).await?;
            tracing::info!("Revoked session");
        }

        Ok(())
    }

    /// Drop every expired session; returns how many were removed
    pub async fn prune_expired(&self) -> Result<usize> {
        let mut sessions = self.load().await?;
        let now = Utc::now();

        let before = sessions.len();
        sessions.retain(|_, record| record.expires_at > now);
        let removed = before - sessions.len();

        if removed > 0 {
            self.save(&sessions).await?;
            tracing::info!("Pruned {} expired sessions", removed);
        }

        Ok(removed)
    }

    async fn load(&self) -> Result<HashMap<String, SessionRecord>> {
        if !self.sessions_path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.sessions_path).await?;
        let sessions: HashMap<String, SessionRecord> = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse session file: {}", e)))?;

        Ok(sessions)
    }

    async fn save(&self, sessions: &HashMap<String, SessionRecord>) -> Result<()> {
        let content = serde_json::to_string_pretty(sessions)?;
        fs::write(&self.sessions_path, content).await?;
        Ok(())
    }
}
