use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use url::Url;

use super::{
    Controller, ControllerStatus, Device, LoginResponse, Session, clamp_history_days,
    normalize_mac,
};
use crate::error::{ApiError, ApiResult};
use crate::schedule::{DeviceConfig, ManagedDevice};
use crate::usage::{ByteUnit, DeviceUsage, HistoryPoint};

const API_PREFIX: &str = "api/v1";

/// How a 400 from the controller maps into the error taxonomy: config saves
/// fail validation, everything else is a rejected command.
#[derive(Debug, Clone, Copy)]
enum BadRequest {
    Validation,
    Command,
}

/// HTTP client for the controller's versioned API.
///
/// Holds a shared [`Session`]; the bearer token is attached to every request
/// except login, and any 401 clears it before the error propagates. The
/// rejected call is reported as an authorization failure, never retried.
pub struct ControllerClient {
    client: Client,
    base: String,
    session: Session,
}

impl ControllerClient {
    pub fn new(base_url: &str, session: Session, timeout: Duration) -> Result<Self> {
        let url = Url::parse(base_url).context("invalid controller URL")?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("controller URL must be http or https (got: {})", url.scheme());
        }

        let client = Client::builder()
            .user_agent(format!("zeitwache/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base, API_PREFIX, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.bearer() {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// Send, read the body, and interpret it. A 401 tears the session down
    /// here so no caller ever observes a stale token.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        on_bad_request: BadRequest,
    ) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        teardown_on_auth(&self.session, interpret(status, &body, on_bad_request))
    }

    /// Like [`Self::execute`] for endpoints whose success body carries no
    /// payload the client needs.
    async fn command(
        &self,
        request: reqwest::RequestBuilder,
        on_bad_request: BadRequest,
    ) -> ApiResult<()> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        teardown_on_auth(&self.session, check(status, &body, on_bad_request))
    }
}

/// Clear the session when a result is an authorization failure, before the
/// error propagates. The rejected call is never retried.
fn teardown_on_auth<T>(session: &Session, result: ApiResult<T>) -> ApiResult<T> {
    if let Err(err) = &result {
        if err.is_auth() {
            tracing::warn!("controller rejected the session token; clearing it");
            session.clear();
        }
    }
    result
}

#[async_trait]
impl Controller for ControllerClient {
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let request = self
            .client
            .post(self.endpoint("auth/login"))
            .json(&json!({ "username": username, "password": password }));

        let login: LoginResponse = self.execute(request, BadRequest::Command).await?;
        self.session.store(login.token.clone());
        tracing::info!("authenticated against controller");
        Ok(login)
    }

    async fn status(&self) -> ApiResult<ControllerStatus> {
        let request = self.authorized(self.client.get(self.endpoint("status")));
        self.execute(request, BadRequest::Command).await
    }

    async fn list_devices(&self) -> ApiResult<Vec<Device>> {
        let request = self.authorized(self.client.get(self.endpoint("devices")));
        self.execute(request, BadRequest::Command).await
    }

    async fn list_managed_devices(&self) -> ApiResult<Vec<ManagedDevice>> {
        let request = self.authorized(self.client.get(self.endpoint("devices/managed")));
        self.execute(request, BadRequest::Command).await
    }

    async fn get_device_config(&self, mac: &str) -> ApiResult<DeviceConfig> {
        let mac = normalize_mac(mac);
        let request = self.authorized(self.client.get(self.endpoint(&format!("devices/{mac}/config"))));
        self.execute(request, BadRequest::Command).await
    }

    async fn save_device_config(&self, mac: &str, config: &DeviceConfig) -> ApiResult<DeviceConfig> {
        // Pre-flight the invariants so an invalid schedule never leaves the
        // client; the controller re-validates on its side regardless.
        config.validate()?;

        let mac = normalize_mac(mac);
        let request = self
            .authorized(self.client.post(self.endpoint(&format!("devices/{mac}/config"))))
            .json(config);
        self.execute(request, BadRequest::Validation).await
    }

    async fn delete_device_config(&self, mac: &str) -> ApiResult<()> {
        let mac = normalize_mac(mac);
        let request =
            self.authorized(self.client.delete(self.endpoint(&format!("devices/{mac}/config"))));
        self.command(request, BadRequest::Command).await
    }

    async fn block_device(&self, mac: &str) -> ApiResult<()> {
        let mac = normalize_mac(mac);
        let request = self.authorized(self.client.post(self.endpoint(&format!("devices/{mac}/block"))));
        self.command(request, BadRequest::Command).await
    }

    async fn unblock_device(&self, mac: &str) -> ApiResult<()> {
        let mac = normalize_mac(mac);
        let request =
            self.authorized(self.client.post(self.endpoint(&format!("devices/{mac}/unblock"))));
        self.command(request, BadRequest::Command).await
    }

    async fn add_bonus_time(&self, mac: &str, minutes: u32) -> ApiResult<()> {
        let mac = normalize_mac(mac);
        let request = self
            .authorized(self.client.post(self.endpoint(&format!("devices/{mac}/add-time"))))
            .json(&json!({ "minutes": minutes }));
        self.command(request, BadRequest::Command).await
    }

    async fn add_bonus_data(&self, mac: &str, amount: u64, unit: ByteUnit) -> ApiResult<()> {
        let mac = normalize_mac(mac);
        let request = self
            .authorized(self.client.post(self.endpoint(&format!("devices/{mac}/add-data"))))
            .json(&json!({ "amount": amount, "unit": unit }));
        self.command(request, BadRequest::Command).await
    }

    async fn all_usage(&self) -> ApiResult<Vec<DeviceUsage>> {
        let request = self.authorized(self.client.get(self.endpoint("usage")));
        self.execute(request, BadRequest::Command).await
    }

    async fn device_usage(&self, mac: &str) -> ApiResult<DeviceUsage> {
        let mac = normalize_mac(mac);
        let request = self.authorized(self.client.get(self.endpoint(&format!("usage/{mac}"))));
        self.execute(request, BadRequest::Command).await
    }

    async fn usage_history(&self, mac: &str, days: u32) -> ApiResult<Vec<HistoryPoint>> {
        let mac = normalize_mac(mac);
        let days = clamp_history_days(days);
        let request = self
            .authorized(self.client.get(self.endpoint(&format!("usage/{mac}/history"))))
            .query(&[("days", days)]);
        self.execute(request, BadRequest::Command).await
    }
}

/// Pull the `error` field out of a failure body, falling back to the raw
/// body or the status line.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.to_string()
    } else {
        trimmed.to_string()
    }
}

fn classify(status: StatusCode, body: &str, on_bad_request: BadRequest) -> ApiError {
    let message = error_message(status, body);
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Auth(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::BAD_REQUEST => match on_bad_request {
            BadRequest::Validation => ApiError::Validation(message),
            BadRequest::Command => ApiError::Command(message),
        },
        _ => ApiError::Controller(message),
    }
}

/// Map a raw `(status, body)` pair into a typed payload or taxonomy error.
/// Pure over its inputs, so the full mapping is testable without a server.
fn interpret<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    on_bad_request: BadRequest,
) -> ApiResult<T> {
    if status.is_success() {
        Ok(serde_json::from_str(body)?)
    } else {
        Err(classify(status, body, on_bad_request))
    }
}

/// Success/failure check for endpoints with opaque success bodies.
fn check(status: StatusCode, body: &str, on_bad_request: BadRequest) -> ApiResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(classify(status, body, on_bad_request))
    }
}
