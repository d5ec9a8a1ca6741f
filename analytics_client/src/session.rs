//! Logged-in user context and its persisted form.
//!
//! The context is an explicit value passed to whatever needs it. It is loaded once at
//! start-up, saved on login and wiped on logout or account deletion.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default, rename = "isLogin")]
    pub is_login: bool,
}

impl SessionContext {
    pub fn logged_in(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            user_email: Some(email.into()),
            is_login: true,
        }
    }

    /// Only a complete record with the login flag set counts as a session.
    pub fn is_restorable(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        self.is_login && present(&self.username) && present(&self.user_email)
    }

    pub fn email(&self) -> Option<&str> {
        self.user_email.as_deref().filter(|s| !s.is_empty())
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|s| !s.is_empty())
    }
}

/// JSON file holding the persisted session keys.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restores the session, or `None` when absent, unreadable or incomplete.
    pub fn load(&self) -> Option<SessionContext> {
        let json = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<SessionContext>(&json) {
            Ok(ctx) if ctx.is_restorable() => {
                debug!("restored session for {:?}", ctx.username);
                Some(ctx)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("ignoring unreadable session file {:?}: {e}", self.path);
                None
            }
        }
    }

    pub fn save(&self, ctx: &SessionContext) -> Result<()> {
        let json = serde_json::to_string_pretty(ctx).context("Failed to serialize session")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session file {:?}", self.path))
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove session file {:?}", self.path)),
        }
    }
}
