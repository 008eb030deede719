//! # Session
//!
//! Signed-in state of the referee: role set and backend cookie.
//!
//! - Replaced as a whole on login and logout, never patched
//! - Written to the session file at that boundary only
//! - Readers get an `Arc<RoleSet>` snapshot, so every check in one decision sees the same roles
//!
//! ## Expiry
//!
//! A single 401 is tolerated, mobile connections drop. Once the number of consecutive
//! authentication failures reaches the limit the session is cleared and the referee has
//! to sign in again. Any successful call resets the count.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use scoring::{FailureKind, RoleSet};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub roles: RoleSet,
    #[serde(default)]
    pub cookie: Option<String>,
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<Option<SavedSession>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read(&self.path)?;
        Ok(Some(serde_json::from_slice::<SavedSession>(&data)?))
    }

    pub fn save(&self, session: &SavedSession) -> Result<(), AppError> {
        let data = serde_json::to_vec_pretty(session)?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    pub fn clear(&self) -> Result<(), AppError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Expired,
}

pub struct Session {
    store: SessionStore,
    roles: Arc<RoleSet>,
    cookie: Option<String>,
    auth_failures: u32,
    failure_limit: u32,
}

impl Session {
    /// Restores the saved session. An unreadable file is discarded rather than fatal.
    pub fn open(store: SessionStore, failure_limit: u32) -> Result<Self, AppError> {
        let saved = match store.load() {
            Ok(saved) => saved.unwrap_or_default(),
            Err(AppError::MalformedPayload(e)) => {
                warn!("Failed to parse saved session, discarding: {e}");
                store.clear()?;
                SavedSession::default()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            store,
            roles: Arc::new(saved.roles),
            cookie: saved.cookie,
            auth_failures: 0,
            failure_limit: failure_limit.max(1),
        })
    }

    pub fn roles(&self) -> Arc<RoleSet> {
        Arc::clone(&self.roles)
    }

    pub fn cookie(&self) -> Option<String> {
        self.cookie.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.roles.is_empty()
    }

    pub fn set_roles(&mut self, roles: RoleSet, cookie: Option<String>) -> Result<(), AppError> {
        self.roles = Arc::new(roles);
        self.cookie = cookie;
        self.auth_failures = 0;

        if self.roles.is_empty() {
            return self.store.clear();
        }

        self.store.save(&SavedSession {
            roles: self.roles.as_ref().clone(),
            cookie: self.cookie.clone(),
        })
    }

    pub fn clear(&mut self) -> Result<(), AppError> {
        info!("Clearing session");
        self.set_roles(RoleSet::default(), None)
    }

    /// Feeds the outcome of an authenticated call into the expiry counter.
    pub fn track<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        match &result {
            Ok(_) => self.auth_failures = 0,
            Err(e) if e.failure().kind == FailureKind::Authentication => {
                if self.record_auth_failure()? == SessionStatus::Expired {
                    return Err(AppError::SignedOut);
                }
            }
            Err(_) => {}
        }

        result
    }

    pub fn record_auth_failure(&mut self) -> Result<SessionStatus, AppError> {
        self.auth_failures += 1;
        warn!(
            "Authentication failure {}/{}",
            self.auth_failures, self.failure_limit
        );

        if self.auth_failures < self.failure_limit {
            return Ok(SessionStatus::Active);
        }

        self.clear()?;
        Ok(SessionStatus::Expired)
    }
}
