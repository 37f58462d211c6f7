use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted session token, so consecutive CLI invocations share one login.
///
/// The file is the durable half of the session layer: `login` writes it,
/// any 401 deletes it, and commands seed their in-process
/// [`crate::api::Session`] from it on startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionState {
    pub token: String,

    #[serde(default)]
    pub user: Option<String>,

    pub acquired_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(token: String, user: Option<String>) -> Self {
        Self {
            token,
            user,
            acquired_at: Utc::now(),
        }
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;

        let state: SessionState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;

        Ok(Some(state))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize session")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write session file: {}", path.display()))?;

        Ok(())
    }

    /// Remove the session file; missing is fine, the outcome is the same.
    pub fn delete(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to delete session file: {}", path.display()))
            }
        }
    }
}

/// Per-user session file location.
pub fn get_session_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "zeitwache")
        .context("Could not determine a data directory for this platform")?;
    Ok(dirs.data_dir().join("session.json"))
}
