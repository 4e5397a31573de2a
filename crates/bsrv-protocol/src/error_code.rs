//! The closed set of wire error codes. Nothing maps onto the wire that is
//! not one of these variants.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnknownError,
    InvalidCommand,
    InvalidParams,
    SessionNotFound,
    SessionClosed,
    NavigationFailed,
    InvalidUrl,
    ElementNotFound,
    ElementNotVisible,
    ElementNotInteractable,
    Timeout,
    WaitTimeout,
    ExtractionFailed,
}

impl ErrorCode {
    /// Coarse category string carried alongside the code in error frames
    /// (`error_type` in the wire envelope).
    pub fn category(self) -> &'static str {
        match self {
            ErrorCode::UnknownError => "unknown",
            ErrorCode::InvalidCommand => "command_error",
            ErrorCode::InvalidParams => "validation",
            ErrorCode::SessionNotFound | ErrorCode::SessionClosed => "session",
            ErrorCode::NavigationFailed | ErrorCode::InvalidUrl => "navigation_error",
            ErrorCode::ElementNotFound
            | ErrorCode::ElementNotVisible
            | ErrorCode::ElementNotInteractable => "interaction_error",
            ErrorCode::Timeout | ErrorCode::WaitTimeout => "timeout",
            ErrorCode::ExtractionFailed => "extraction_error",
        }
    }
}
