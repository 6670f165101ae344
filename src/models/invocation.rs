//! Invocation requests, results and the dispatch error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Request to execute one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Name of the tool to invoke
    pub tool: String,

    /// Arguments keyed by parameter name
    #[serde(default)]
    pub arguments: Value,
}

impl InvocationRequest {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }
}

/// Errors produced by the tool registry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("tool '{0}' is already registered")]
    DuplicateName(String),

    #[error("tool '{0}' not found")]
    NotFound(String),

    #[error("invalid argument '{param}': {reason}")]
    InvalidArgument { param: String, reason: String },

    #[error("tool '{tool}' failed: {message}")]
    Handler { tool: String, message: String },
}

impl ToolError {
    pub fn invalid_argument(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::DuplicateName(_) => ErrorKind::DuplicateName,
            ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            ToolError::Handler { .. } => ErrorKind::HandlerError,
        }
    }
}

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DuplicateName,
    NotFound,
    InvalidArgument,
    HandlerError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateName => "duplicate_name",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::HandlerError => "handler_error",
        }
    }
}

/// Error half of an [`InvocationResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ToolError> for ErrorDescriptor {
    fn from(err: &ToolError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one invocation, ready for serialization back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationResult {
    Success { value: Value },
    Error { error: ErrorDescriptor },
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success { .. })
    }

    /// Error kind, if this result is an error
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            InvocationResult::Success { .. } => None,
            InvocationResult::Error { error } => Some(error.kind),
        }
    }
}

impl From<Result<Value, ToolError>> for InvocationResult {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(value) => InvocationResult::Success { value },
            Err(err) => InvocationResult::Error {
                error: ErrorDescriptor::from(&err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_result_serialization() {
        let result = InvocationResult::from(Err(ToolError::invalid_argument(
            "text",
            "missing required argument",
        )));
        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "status": "error",
                "error": {
                    "kind": "invalid_argument",
                    "message": "invalid argument 'text': missing required argument"
                }
            })
        );
    }

    #[test]
    fn test_success_result_serialization() {
        let result = InvocationResult::from(Ok(json!("olleh")));
        assert!(result.is_success());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "success", "value": "olleh"})
        );
    }

    #[test]
    fn test_request_defaults_arguments() {
        let request: InvocationRequest = serde_json::from_str(r#"{"tool": "system_info"}"#).unwrap();
        assert_eq!(request.tool, "system_info");
        assert_eq!(request.arguments, Value::Null);
    }
}
