pub mod devices;
pub mod quota;
pub mod session;
pub mod usage;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::api::{ControllerClient, Session};
use crate::config::{self, ClientConfig};
use crate::error::ApiResult;
use crate::state::{self, SessionState};

/// Everything a command needs to talk to the controller.
pub struct Dashboard {
    pub client: ControllerClient,
    pub config: ClientConfig,
    pub session_path: PathBuf,
}

/// Resolve config, restore any stored session token, and build the client.
pub fn connect(config_path: Option<&Path>) -> Result<Dashboard> {
    let config_path = resolve_config_path(config_path)?;
    let config = config::load_config(&config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}. Run 'zeitwache init' first.",
            config_path.display()
        )
    })?;

    let session_path = state::get_session_path()?;
    let session = match SessionState::load(&session_path)? {
        Some(stored) => Session::with_token(stored.token),
        None => Session::new(),
    };

    let client = ControllerClient::new(&config.controller.url, session, config.timeout())?;

    Ok(Dashboard {
        client,
        config,
        session_path,
    })
}

pub fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => config::get_config_path(),
    }
}

/// Unwrap an API result for a command. Authorization failures end the
/// session here, globally: the stored token is deleted and the user pointed
/// at `login`; they are never rendered as an inline application error.
pub fn finish<T>(dashboard: &Dashboard, result: ApiResult<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_auth() => {
            SessionState::delete(&dashboard.session_path)?;
            eprintln!("Session ended by the controller.");
            eprintln!("Run 'zeitwache login' to re-authenticate, then re-issue the command.");
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
