//! The `PageDriver` capability the core consumes from an external
//! browser-driver collaborator. Any implementation that honors this
//! contract may back a `BrowserManager` — the manager holds only these
//! trait objects and never assumes a concrete browser engine.

use std::collections::HashMap;

use async_trait::async_trait;
use bsrv_protocol::{MouseButton, WaitCondition};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("driver operation timed out")]
    Timeout,
    #[error("{0}")]
    Other(String),
}

impl DriverError {
    pub fn other(msg: impl Into<String>) -> Self {
        DriverError::Other(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LaunchArgs {
    pub headless: bool,
    pub extra_args: Vec<String>,
    pub slow_mo_ms: u32,
}

#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: Option<String>,
    pub ignore_https_errors: bool,
    pub javascript_enabled: bool,
    pub accept_downloads: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            user_agent: None,
            ignore_https_errors: false,
            javascript_enabled: true,
            accept_downloads: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Visible,
    Hidden,
    Attached,
    Detached,
}

#[derive(Debug, Clone)]
pub struct ClickOptions {
    pub button: MouseButton,
    pub click_count: u32,
    pub force: bool,
    pub timeout_ms: u32,
    pub position: Option<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct NavigateOutcome {
    pub final_url: String,
    pub status: Option<u16>,
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn launch(&self, args: LaunchArgs) -> Result<Box<dyn Browser>, DriverError>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_context(&self, options: ContextOptions) -> Result<Box<dyn Context>, DriverError>;
    async fn close(&self) -> Result<(), DriverError>;
}

#[async_trait]
pub trait Context: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Page>, DriverError>;
    async fn set_default_timeout(&self, timeout_ms: u32);
    async fn set_default_navigation_timeout(&self, timeout_ms: u32);
    async fn close(&self) -> Result<(), DriverError>;
}

#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(
        &self,
        url: &str,
        wait_until: WaitCondition,
        timeout_ms: u32,
    ) -> Result<NavigateOutcome, DriverError>;
    async fn url(&self) -> String;
    async fn title(&self) -> Result<String, DriverError>;
    async fn set_extra_http_headers(&self, headers: HashMap<String, String>) -> Result<(), DriverError>;
    async fn wait_for_load_state(&self, state: WaitCondition, timeout_ms: u32) -> Result<(), DriverError>;
    async fn wait_for_function(
        &self,
        js: &str,
        timeout_ms: u32,
        polling_ms: u32,
    ) -> Result<(), DriverError>;
    fn locator(&self, selector: &str) -> Box<dyn Locator>;
}

#[async_trait]
pub trait Locator: Send + Sync {
    /// A handle to the `index`-th match, for `extract`'s `multiple` mode.
    fn nth(&self, index: usize) -> Box<dyn Locator>;
    async fn count(&self) -> Result<usize, DriverError>;
    async fn wait_for(&self, state: ElementState, timeout_ms: u32) -> Result<(), DriverError>;
    async fn bounding_box(&self) -> Result<Option<BoundingBox>, DriverError>;
    async fn is_visible(&self) -> Result<bool, DriverError>;
    async fn tag_name(&self) -> Result<String, DriverError>;
    async fn text_content(&self) -> Result<Option<String>, DriverError>;
    async fn inner_html(&self) -> Result<String, DriverError>;
    async fn get_attribute(&self, name: &str) -> Result<Option<String>, DriverError>;
    async fn input_value(&self) -> Result<String, DriverError>;
    async fn clear(&self) -> Result<(), DriverError>;
    async fn fill(&self, text: &str) -> Result<(), DriverError>;
    async fn type_text(&self, text: &str, delay_ms: u32) -> Result<(), DriverError>;
    async fn press(&self, key: &str) -> Result<(), DriverError>;
    async fn click(&self, options: ClickOptions) -> Result<(), DriverError>;
    async fn evaluate(&self, js: &str) -> Result<serde_json::Value, DriverError>;
}
