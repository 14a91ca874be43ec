//! Generic HTTP request executor.
//!
//! Every REST service method in the SDK is thin glue over this capability:
//! build a path, attach parameters, decode JSON. [`RequestExecutor`] is the
//! seam; [`HttpExecutor`] is the reqwest-backed implementation. Retry policy,
//! sessions, and cookies are deliberately not handled here.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::error::{PulseLinkError, Result};

/// Header carrying the project identifier on every request.
const PROJECT_HEADER: &str = "X-Pulse-Project";

/// Capability to execute one backend REST call.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Execute `method` against `path` (relative to the endpoint), with an
    /// optional JSON body, and return the decoded JSON response.
    async fn call(&self, method: Method, path: &str, body: Option<JsonValue>) -> Result<JsonValue>;
}

/// reqwest-backed [`RequestExecutor`].
#[derive(Clone)]
pub struct HttpExecutor {
    endpoint: String,
    project: String,
    http: reqwest::Client,
}

impl HttpExecutor {
    /// Create an executor for `endpoint`, attaching `project` to every call.
    pub fn new(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PulseLinkError::ConfigurationError(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            project: project.into(),
            http,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn call(&self, method: Method, path: &str, body: Option<JsonValue>) -> Result<JsonValue> {
        let url = self.url_for(path);
        log::debug!("[pulse-link] {} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header(PROJECT_HEADER, &self.project);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<JsonValue>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(JsonValue::as_str).map(str::to_owned))
                .unwrap_or(text);
            return Err(PulseLinkError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        if text.is_empty() {
            Ok(JsonValue::Null)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }
}
