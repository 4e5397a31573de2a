//! Browser session lifecycle and command execution: the driver capability
//! contract (C7's collaborator), sessions (C7), the manager (C8), the
//! session logger (C6), and error classification shared by both.

pub mod driver;
pub mod error;
pub mod logger;
pub mod manager;
pub mod memory_driver;
pub mod session;

pub use driver::{
    Browser, BoundingBox, ClickOptions, Context, ContextOptions, DriverError, ElementState,
    LaunchArgs, Locator, NavigateOutcome, Page, PageDriver,
};
pub use error::CoreError;
pub use logger::{LogEvent, LogEventType, SessionLogger, SessionStats};
pub use manager::{BrowserManager, BrowserManagerConfig, ManagerStats, SessionOverrides};
pub use session::BrowserSession;
