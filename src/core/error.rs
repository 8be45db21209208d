use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,
    ConfigNotFound,

    ValidationMissingArgument,
    ValidationInvalidArgument,

    ProjectNotFound,
    EnvironmentNotFound,
    EnvironmentNotAvailable,
    ScriptNotFound,

    SshKeysAlreadyExist,
    SshPublicKeyMissing,
    SshTunnelFailed,

    RemoteCommandFailed,

    ApiRequestFailed,
    WatchFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigNotFound => "config.not_found",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::ProjectNotFound => "project.not_found",
            ErrorCode::EnvironmentNotFound => "environment.not_found",
            ErrorCode::EnvironmentNotAvailable => "environment.not_available",
            ErrorCode::ScriptNotFound => "script.not_found",

            ErrorCode::SshKeysAlreadyExist => "ssh.keys_already_exist",
            ErrorCode::SshPublicKeyMissing => "ssh.public_key_missing",
            ErrorCode::SshTunnelFailed => "ssh.tunnel_failed",

            ErrorCode::RemoteCommandFailed => "remote.command_failed",

            ErrorCode::ApiRequestFailed => "api.request_failed",
            ErrorCode::WatchFailed => "watch.failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

/// Error returned by every fallible operation in the crate.
///
/// `details` carries machine-readable context for the JSON envelope;
/// `hints` are suggestions shown to the user.
#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub output: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

fn to_details<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| json!({}))
}

/// `{"error": .., "context": ..}` with `context` omitted when absent.
fn error_with_context(error: String, context: Option<String>) -> Value {
    let mut details = json!({ "error": error });
    if let Some(context) = context {
        details["context"] = Value::String(context);
    }
    details
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required option",
            json!({ "args": args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let mut details = json!({ "field": field.into(), "problem": problem.into() });
        if let Some(id) = id {
            details["id"] = Value::String(id);
        }
        if let Some(tried) = tried {
            details["tried"] = to_details(tried);
        }
        Self::new(ErrorCode::ValidationInvalidArgument, "Invalid argument", details)
    }

    pub fn project_not_found(path: impl Into<String>) -> Self {
        Self::not_found(ErrorCode::ProjectNotFound, "No stagehand.json found", path, Vec::new())
            .with_hint("Run stagehand from a project root containing stagehand.json")
    }

    pub fn environment_not_found(id: impl Into<String>, available: Vec<String>) -> Self {
        Self::not_found(ErrorCode::EnvironmentNotFound, "Environment not found", id, available)
            .with_hint("Run 'stagehand hosts' to see configured environments")
    }

    pub fn script_not_found(id: impl Into<String>, available: Vec<String>) -> Self {
        Self::not_found(ErrorCode::ScriptNotFound, "Script not found", id, available)
    }

    fn not_found(code: ErrorCode, message: &str, id: impl Into<String>, available: Vec<String>) -> Self {
        let mut details = json!({ "id": id.into() });
        if !available.is_empty() {
            details["available"] = to_details(available);
        }
        Self::new(code, message, details)
    }

    /// A host-scoped step ran without a selected environment.
    pub fn environment_not_available(step: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::EnvironmentNotAvailable,
            "Environment not available for step",
            json!({ "step": step.into() }),
        )
        .with_hint("Pass --env to select an environment")
    }

    pub fn ssh_keys_already_exist(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SshKeysAlreadyExist,
            "SSH keys have already been generated",
            json!({ "path": path.into() }),
        )
    }

    pub fn ssh_public_key_missing(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SshPublicKeyMissing,
            "SSH keys have not been generated",
            json!({ "path": path.into() }),
        )
        .with_hint("Run 'stagehand ssh generate-key' first")
    }

    pub fn ssh_tunnel_failed(host: impl Into<String>, output: Vec<String>) -> Self {
        Self::new(
            ErrorCode::SshTunnelFailed,
            "Could not open SSH tunnel",
            json!({ "host": host.into(), "output": output }),
        )
        .retryable()
    }

    pub fn config_not_found(host: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            "No configuration found",
            json!({ "host": host.into() }),
        )
    }

    pub fn remote_command_failed(details: RemoteCommandFailedDetails) -> Self {
        Self::new(ErrorCode::RemoteCommandFailed, "Remote command failed", to_details(details))
    }

    pub fn api_request_failed(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ApiRequestFailed,
            "Notification API request failed",
            json!({ "error": error.into() }),
        )
        .retryable()
    }

    pub fn watch_failed(error: impl Into<String>) -> Self {
        Self::new(ErrorCode::WatchFailed, "File watcher failed", json!({ "error": error.into() }))
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            json!({ "path": path.into(), "error": err.to_string(), "line": err.line() }),
        )
    }

    pub fn config_invalid_value(key: impl Into<String>, value: Option<String>, problem: impl Into<String>) -> Self {
        let mut details = json!({ "key": key.into(), "problem": problem.into() });
        if let Some(value) = value {
            details["value"] = Value::String(value);
        }
        Self::new(ErrorCode::ConfigInvalidValue, "Invalid configuration value", details)
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(ErrorCode::InternalIoError, "IO error", error_with_context(error.into(), context))
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(ErrorCode::InternalJsonError, "JSON error", error_with_context(error.into(), context))
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalUnexpected, "Unexpected error", json!({ "error": error.into() }))
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint { message: message.into() });
        self
    }

    /// Failures that may succeed on a later attempt (network, ssh).
    pub fn retryable(mut self) -> Self {
        self.retryable = Some(true);
        self
    }

    /// Message plus the most useful detail field, for plain-text rendering.
    pub fn describe(&self) -> String {
        let detail = self
            .details
            .get("error")
            .or_else(|| self.details.get("problem"))
            .and_then(Value::as_str);

        match detail {
            Some(detail) => format!("{}: {}", self.message, detail),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_not_available_has_stable_code() {
        let err = Error::environment_not_available("deploy-files");
        assert_eq!(err.code.as_str(), "environment.not_available");
        assert_eq!(err.details["step"], "deploy-files");
        assert_eq!(err.hints.len(), 1);
    }

    #[test]
    fn describe_includes_error_detail() {
        let err = Error::internal_io("permission denied", Some("write cache".to_string()));
        assert_eq!(err.describe(), "IO error: permission denied");
    }

    #[test]
    fn describe_falls_back_to_message() {
        let err = Error::ssh_keys_already_exist("/tmp/ssh-keys/id_rsa");
        assert_eq!(err.describe(), "SSH keys have already been generated");
    }

    #[test]
    fn optional_details_are_omitted() {
        let err = Error::internal_io("disk full", None);
        assert!(err.details.get("context").is_none());

        let err = Error::script_not_found("deploy", Vec::new());
        assert!(err.details.get("available").is_none());
        assert_eq!(err.details["id"], "deploy");
    }

    #[test]
    fn tunnel_failures_are_retryable() {
        assert_eq!(Error::ssh_tunnel_failed("web1", Vec::new()).retryable, Some(true));
        assert_eq!(Error::watch_failed("boom").retryable, None);
    }
}
