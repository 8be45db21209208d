//! JSON envelope written to stdout and the exit code chosen for each error.

use serde::Serialize;
use stagehand::error::Hint;
use stagehand::{Error, ErrorCode, Result};

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(CliError::from(&err)),
            },
        }
    }
}

impl From<&Error> for CliError {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code.as_str().to_string(),
            message: err.message.clone(),
            details: err.details.clone(),
            hints: (!err.hints.is_empty()).then(|| err.hints.clone()),
            retryable: err.retryable,
        }
    }
}

/// Print the envelope as pretty JSON on stdout. A closed pipe is not an error.
pub fn print_result<T: Serialize>(result: Result<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = serde_json::to_string_pretty(&CliResponse::from_result(result))
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize response".to_string())))?;

    match writeln!(io::stdout().lock(), "{}", payload) {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
            Err(Error::internal_io(e.to_string(), Some("write stdout".to_string())))
        }
        _ => Ok(()),
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(result: Result<(T, i32)>) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(err.to_string(), Some("serialize response".to_string()))),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationMissingArgument
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::EnvironmentNotAvailable => 2,

        ErrorCode::ProjectNotFound
        | ErrorCode::EnvironmentNotFound
        | ErrorCode::ScriptNotFound
        | ErrorCode::ConfigNotFound => 4,

        ErrorCode::SshKeysAlreadyExist | ErrorCode::SshPublicKeyMissing | ErrorCode::SshTunnelFailed => 10,

        ErrorCode::RemoteCommandFailed | ErrorCode::ApiRequestFailed => 20,

        ErrorCode::WatchFailed
        | ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_code_and_hints() {
        let err = Error::environment_not_available("deploy");
        let value = serde_json::to_value(CliResponse::<()>::from_result(Err(err))).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "environment.not_available");
        assert!(value["error"]["hints"].is_array());
        assert!(value.get("data").is_none());
    }

    #[test]
    fn not_found_errors_exit_with_four() {
        let (result, code) = map_cmd_result_to_json::<()>(Err(Error::script_not_found("deploy", vec![])));
        assert!(result.is_err());
        assert_eq!(code, 4);
    }

    #[test]
    fn command_exit_code_passes_through() {
        let (result, code) = map_cmd_result_to_json(Ok((vec!["a"], 1)));
        assert_eq!(result.unwrap()[0], "a");
        assert_eq!(code, 1);
    }
}
