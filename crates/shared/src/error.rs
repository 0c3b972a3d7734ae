use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 409 | 422 => ErrorCode::Validation,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub message: String,
    pub code: String,
}

/// Either a plain message or a list of per-rule validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    Plain(String),
    Validation(Vec<ValidationEntry>),
}

impl ErrorMessage {
    pub fn summary(&self) -> String {
        match self {
            ErrorMessage::Plain(message) => message.clone(),
            ErrorMessage::Validation(entries) => entries
                .iter()
                .map(|entry| entry.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: ErrorMessage,
}

impl ErrorEntry {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            error: None,
            field: None,
            message: ErrorMessage::Plain(message.into()),
        }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::from_status(self.status_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Option<String>,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {}", summarize_fields(.0))]
    Validation(Vec<FieldError>),
    #[error("{code:?}: {message}")]
    Failed { code: ErrorCode, message: String },
    #[error("response carried neither data nor errors")]
    MissingData,
}

impl RpcError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RpcError::Unauthorized(_) => ErrorCode::Unauthorized,
            RpcError::NotFound(_) => ErrorCode::NotFound,
            RpcError::Validation(_) => ErrorCode::Validation,
            RpcError::Failed { code, .. } => *code,
            RpcError::MissingData => ErrorCode::Internal,
        }
    }

    /// Classifies a non-empty error list. Authentication wins over everything
    /// else, then not-found, then validation; otherwise the first entry decides.
    pub fn from_entries(entries: &[ErrorEntry]) -> Self {
        let codes: Vec<ErrorCode> = entries.iter().map(ErrorEntry::code).collect();

        if let Some(entry) = entries.iter().find(|e| e.code() == ErrorCode::Unauthorized) {
            return RpcError::Unauthorized(entry.message.summary());
        }
        if let Some(entry) = entries.iter().find(|e| e.code() == ErrorCode::NotFound) {
            return RpcError::NotFound(entry.message.summary());
        }
        if codes.contains(&ErrorCode::Validation) {
            let fields = entries
                .iter()
                .filter(|e| e.code() == ErrorCode::Validation)
                .map(|e| FieldError {
                    field: e.field.clone(),
                    messages: match &e.message {
                        ErrorMessage::Plain(message) => vec![message.clone()],
                        ErrorMessage::Validation(list) => {
                            list.iter().map(|v| v.message.clone()).collect()
                        }
                    },
                })
                .collect();
            return RpcError::Validation(fields);
        }

        match entries.first() {
            Some(entry) => RpcError::Failed {
                code: entry.code(),
                message: entry
                    .error
                    .clone()
                    .map(|error| format!("{error}: {}", entry.message.summary()))
                    .unwrap_or_else(|| entry.message.summary()),
            },
            None => RpcError::MissingData,
        }
    }
}

fn summarize_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| match &f.field {
            Some(field) => format!("{field}: {}", f.messages.join(", ")),
            None => f.messages.join(", "),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
