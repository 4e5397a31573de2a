//! Internal error classification. Every variant here has a total mapping
//! onto the closed wire [`ErrorCode`] set — driver exceptions are caught
//! at this boundary and never allowed to propagate past a handler.

use bsrv_protocol::ErrorCode;
use serde_json::{Value, json};

use crate::driver::DriverError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("navigation failed: {0}")]
    NavigationFailed(DriverError),
    #[error("element not found for selector {selector}")]
    ElementNotFound { selector: String },
    #[error("element not visible for selector {selector}")]
    ElementNotVisible { selector: String },
    #[error("interaction failed: {0}")]
    Interaction(DriverError),
    #[error("driver operation timed out")]
    Timeout,
    #[error("wait for {condition} timed out after {wait_time_ms}ms")]
    WaitTimeout { condition: String, wait_time_ms: u64 },
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Unknown(String),
}

impl CoreError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CoreError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            CoreError::NavigationFailed(_) => ErrorCode::NavigationFailed,
            CoreError::ElementNotFound { .. } => ErrorCode::ElementNotFound,
            CoreError::ElementNotVisible { .. } => ErrorCode::ElementNotVisible,
            CoreError::Interaction(_) => ErrorCode::ElementNotInteractable,
            CoreError::Timeout => ErrorCode::Timeout,
            CoreError::WaitTimeout { .. } => ErrorCode::WaitTimeout,
            CoreError::Extraction(_) => ErrorCode::ExtractionFailed,
            CoreError::InvalidParams(_) => ErrorCode::InvalidParams,
            CoreError::InvalidUrl(_) => ErrorCode::InvalidUrl,
            CoreError::Unknown(_) => ErrorCode::UnknownError,
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            CoreError::WaitTimeout { condition, wait_time_ms } => {
                Some(json!({ "condition": condition, "wait_time_ms": wait_time_ms }))
            }
            _ => None,
        }
    }

    /// Classifies a raw driver error for a navigate/click/fill/extract
    /// call: timeouts map to `Timeout`, everything else to the supplied
    /// fallback constructor.
    pub fn from_driver(err: DriverError, fallback: impl FnOnce(DriverError) -> CoreError) -> CoreError {
        if err.is_timeout() { CoreError::Timeout } else { fallback(err) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_driver_error_becomes_timeout_code() {
        let err = CoreError::from_driver(DriverError::Timeout, CoreError::NavigationFailed);
        assert_eq!(err.error_code(), ErrorCode::Timeout);
    }

    #[test]
    fn other_driver_error_uses_fallback() {
        let err = CoreError::from_driver(DriverError::other("boom"), CoreError::NavigationFailed);
        assert_eq!(err.error_code(), ErrorCode::NavigationFailed);
    }

    #[test]
    fn wait_timeout_carries_details() {
        let err = CoreError::WaitTimeout { condition: "visible".into(), wait_time_ms: 250 };
        let details = err.details().unwrap();
        assert_eq!(details["condition"], "visible");
        assert_eq!(details["wait_time_ms"], 250);
    }
}
