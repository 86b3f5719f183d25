// src/error.rs
use thiserror::Error;

/// Local, pre-network validation failures. These never reach the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File is too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported file type for {file_name}: PDF files only")]
    UnsupportedType { file_name: String },

    #[error("File is empty")]
    EmptyFile,

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Field '{field}' exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            Self::EmptyFile => "EMPTY_FILE",
            Self::EmptyField(_) => "EMPTY_FIELD",
            Self::TooLong { .. } => "TOO_LONG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Not signed in")]
    Unauthenticated,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Network or connection error: {0}")]
    Network(String),

    #[error("Server rejected the request ({status}): {detail}")]
    Remote { status: u16, detail: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Request timed out")]
    TimedOut,

    #[error("Request cancelled")]
    Cancelled,

    #[error("{0} already in progress")]
    Busy(&'static str),

    #[error("Authentication error: {0}")]
    Identity(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Validation(inner) => inner.code(),
            Self::Network(_) => "NETWORK_ERROR",
            Self::Remote { .. } => "REMOTE_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::TimedOut => "TIMED_OUT",
            Self::Cancelled => "CANCELLED",
            Self::Busy(_) => "BUSY",
            Self::Identity(_) => "IDENTITY_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimedOut
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_code_passes_through() {
        let err: ClientError = ValidationError::FileTooLarge { size: 10, max: 5 }.into();
        assert_eq!(err.code(), "FILE_TOO_LARGE");
    }

    #[test]
    fn test_remote_error_message_carries_detail() {
        let err = ClientError::Remote {
            status: 400,
            detail: "Invalid file type. Only PDF is allowed.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Server rejected the request (400): Invalid file type. Only PDF is allowed."
        );
    }
}
