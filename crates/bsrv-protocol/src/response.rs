//! Response envelopes. One of these is produced for every command received,
//! success or error, never both, never neither.

use serde::Serialize;
use serde_json::Value;

use crate::error_code::ErrorCode;

#[derive(Debug, Clone, Serialize)]
pub struct NavigateResponse {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub redirected: bool,
    pub load_time_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClickPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClickResponse {
    pub element_found: bool,
    pub element_visible: bool,
    pub click_position: ClickPosition,
    pub element_text: String,
    pub element_tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FillResponse {
    pub element_found: bool,
    pub element_type: String,
    pub text_entered: String,
    pub previous_value: String,
    pub current_value: String,
    pub validation_passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElementInfo {
    pub tag: String,
    pub class: String,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractResponse {
    pub elements_found: usize,
    pub data: Value,
    pub element_info: Vec<ElementInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitConditionDetails {
    pub condition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    pub timeout: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitResponse {
    pub condition_met: bool,
    pub wait_time_ms: u64,
    pub final_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_count: Option<usize>,
    pub condition_details: WaitConditionDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Navigate(NavigateResponse),
    Click(ClickResponse),
    Fill(FillResponse),
    Extract(ExtractResponse),
    Wait(WaitResponse),
}

/// The `success=true` envelope. `id` echoes the originating command.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub id: String,
    pub success: bool,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl SuccessResponse {
    pub fn new(id: impl Into<String>, timestamp: f64, body: ResponseBody) -> Self {
        Self { id: id.into(), success: true, timestamp, execution_time_ms: None, body }
    }

    pub fn with_execution_time_ms(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }
}

/// The `success=false` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub success: bool,
    pub error: String,
    pub error_code: ErrorCode,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: f64,
}

impl ErrorResponse {
    pub fn new(
        id: Option<String>,
        error: impl Into<String>,
        error_code: ErrorCode,
        timestamp: f64,
    ) -> Self {
        Self {
            id,
            success: false,
            error: error.into(),
            error_type: error_code.category().to_string(),
            error_code,
            details: None,
            timestamp,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = error_type.into();
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

impl Response {
    pub fn id(&self) -> Option<&str> {
        match self {
            Response::Success(s) => Some(&s.id),
            Response::Error(e) => e.id.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_flattened_body() {
        let resp = SuccessResponse::new(
            "a",
            1.0,
            ResponseBody::Navigate(NavigateResponse {
                url: "https://example.test/".into(),
                title: "Example".into(),
                status_code: Some(200),
                redirected: false,
                load_time_ms: 12,
            }),
        );
        let v = serde_json::to_value(&Response::Success(resp)).unwrap();
        assert_eq!(v["id"], "a");
        assert_eq!(v["success"], true);
        assert_eq!(v["url"], "https://example.test/");
        assert_eq!(v["load_time_ms"], 12);
    }

    #[test]
    fn error_omits_absent_id() {
        let resp = ErrorResponse::new(None, "bad frame", ErrorCode::InvalidCommand, 2.0);
        let v = serde_json::to_value(&Response::Error(resp)).unwrap();
        assert!(v.get("id").is_none());
        assert_eq!(v["success"], false);
        assert_eq!(v["error_code"], "INVALID_COMMAND");
    }
}
