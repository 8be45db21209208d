//! Notification API client.
//!
//! The API only ever answers pass/fail: a 200 means success, anything else
//! carries a diagnostic that is either a plain reason phrase or a JSON
//! object with `message` and `code`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use crate::defaults::ApiConfig;
use crate::error::{Error, Result};
use crate::script::ScriptReport;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub reason: String,
    pub body: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    code: serde_json::Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.trim_start().starts_with("application/json"))
    }

    /// Uniform one-line rendering of a non-success response.
    pub fn diagnostic(&self) -> String {
        if self.is_json() {
            if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&self.body) {
                let code = match body.code {
                    serde_json::Value::String(code) => code,
                    serde_json::Value::Null => self.status.to_string(),
                    other => other.to_string(),
                };
                return format!("{} ({})", body.message, code);
            }
        }

        if self.reason.is_empty() {
            format!("HTTP {}", self.status)
        } else {
            self.reason.clone()
        }
    }
}

pub trait NotificationClient {
    fn check_project(&self) -> Result<ApiResponse>;

    fn post_results(&self, report: &ScriptReport) -> Result<ApiResponse>;
}

pub struct HttpNotificationClient {
    client: Client,
    base_url: String,
    project_key: String,
}

impl HttpNotificationClient {
    pub fn new(config: &ApiConfig, project_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("stagehand/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_key: project_key.into(),
        })
    }

    /// A client when the project key variable is set, otherwise `None`.
    pub fn from_env(config: &ApiConfig) -> Result<Option<Self>> {
        match std::env::var(&config.project_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(Self::new(config, key.trim())?)),
            _ => Ok(None),
        }
    }

    fn project_url(&self) -> String {
        format!("{}/projects/{}", self.base_url, self.project_key)
    }

    fn into_api_response(response: reqwest::blocking::Response) -> Result<ApiResponse> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .map_err(|e| Error::api_request_failed(e.to_string()))?;

        Ok(ApiResponse {
            status: status.as_u16(),
            content_type,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

impl NotificationClient for HttpNotificationClient {
    fn check_project(&self) -> Result<ApiResponse> {
        let response = self
            .client
            .get(self.project_url())
            .send()
            .map_err(|e| Error::api_request_failed(e.to_string()))?;
        Self::into_api_response(response)
    }

    fn post_results(&self, report: &ScriptReport) -> Result<ApiResponse> {
        let body = json!({
            "script": report.script,
            "environment": report.environment,
            "status": report.status,
            "results": report.results,
            "skipped": report.skipped,
        });

        let response = self
            .client
            .post(format!("{}/results", self.project_url()))
            .json(&body)
            .send()
            .map_err(|e| Error::api_request_failed(e.to_string()))?;
        Self::into_api_response(response)
    }
}
