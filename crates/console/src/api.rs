//! Backend queries consumed by the console.
//!
//! [`ConsoleApi`] is the seam between the fetch lifecycle and the transport.
//! [`HttpConsoleApi`] implements it over the backend's JSON endpoints using
//! [`reqwest`]; tests substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use x121_console_core::credentials::{StaticCredentials, ADMIN_KEY_HEADER};
use x121_console_core::dashboard::DashboardStats;
use x121_console_core::error::ConsoleError;
use x121_console_core::feedback::FeedbackBundle;
use x121_console_core::identity::CallerIdentity;
use x121_console_core::videos::OwnedItem;

use crate::config::ConsoleConfig;
use crate::retry::RetryableError;

/// Gated: aggregate platform metrics.
pub const DASHBOARD_STATS_PATH: &str = "/api/admin/dashboard-stats";
/// Gated: feedback summary and records.
pub const FEEDBACK_PATH: &str = "/api/admin/feedback";
/// Ungated: videos owned by a caller.
pub const VIDEOS_PATH: &str = "/api/videos";

/// Errors from the backend query layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The body was not the expected JSON shape.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl RetryableError for ApiError {
    /// Transport failures and 5xx responses may succeed on another attempt;
    /// 4xx responses and malformed bodies will not.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => !e.is_decode() && !e.is_builder(),
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

impl From<ApiError> for ConsoleError {
    fn from(err: ApiError) -> Self {
        ConsoleError::FetchFailed(err.to_string())
    }
}

/// The three read-only queries behind the console.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError>;

    async fn feedback_bundle(&self) -> Result<FeedbackBundle, ApiError>;

    /// Videos owned by `identity`, in backend order.
    async fn owned_items(&self, identity: &CallerIdentity) -> Result<Vec<OwnedItem>, ApiError>;
}

/// HTTP client for the console endpoints of one backend.
pub struct HttpConsoleApi {
    client: reqwest::Client,
    base_url: String,
    credentials: StaticCredentials,
}

impl HttpConsoleApi {
    /// Build a client with the configured base URL, credentials and
    /// transport timeout.
    pub fn new(config: &ConsoleConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(
            client,
            config.api_url.clone(),
            config.credentials.clone(),
        ))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: StaticCredentials,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    /// `GET` a gated admin endpoint with the shared-secret header.
    async fn get_gated<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header(ADMIN_KEY_HEADER, self.credentials.header_value())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Ensure a success status, returning the status and body otherwise.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get_gated(DASHBOARD_STATS_PATH).await
    }

    async fn feedback_bundle(&self) -> Result<FeedbackBundle, ApiError> {
        self.get_gated(FEEDBACK_PATH).await
    }

    async fn owned_items(&self, identity: &CallerIdentity) -> Result<Vec<OwnedItem>, ApiError> {
        let param = match identity {
            CallerIdentity::UserId(id) => ("user_id", id.as_str()),
            CallerIdentity::Email(email) => ("email", email.as_str()),
            CallerIdentity::Absent => return Ok(Vec::new()),
        };

        let response = self
            .client
            .get(format!("{}{VIDEOS_PATH}", self.base_url))
            .query(&[param])
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
