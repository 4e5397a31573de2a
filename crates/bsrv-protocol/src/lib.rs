//! Wire types for the browser command protocol: the five command variants
//! (C1), their responses, and the closed error-code vocabulary.

pub mod command;
pub mod error_code;
pub mod response;

pub use command::{
    ClickCommand, Command, CommandHeader, ExtractCommand, ExtractType, FillCommand, MouseButton,
    NavigateCommand, Position, ValidationError, WaitCommand, WaitCondition, WaitUntil,
};
pub use error_code::ErrorCode;
pub use response::{
    ClickPosition, ClickResponse, ElementInfo, ErrorResponse, ExtractResponse, FillResponse,
    NavigateResponse, Response, ResponseBody, SuccessResponse, WaitConditionDetails, WaitResponse,
};
