//! C8 — owns the process-wide driver bootstrap, the session map, and the
//! five `execute_*` state machines dispatched from the connection handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bsrv_protocol::response::{
    ClickPosition, ClickResponse, ElementInfo, ExtractResponse, FillResponse, NavigateResponse,
    WaitConditionDetails, WaitResponse,
};
use bsrv_protocol::{
    ClickCommand, ExtractCommand, ExtractType, FillCommand, NavigateCommand, WaitCommand, WaitCondition,
};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::driver::{
    Browser, ClickOptions, Context, ContextOptions, DriverError, ElementState, LaunchArgs, PageDriver,
};
use crate::error::CoreError;
use crate::logger::{LogEvent, LogEventType, SessionLogger};
use crate::session::BrowserSession;

#[derive(Debug, Clone)]
pub struct BrowserManagerConfig {
    pub headless: bool,
    pub no_sandbox: bool,
    pub disable_dev_shm: bool,
    pub disable_web_security: bool,
    pub slow_mo_ms: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: Option<String>,
    pub ignore_https_errors: bool,
    pub default_timeout_ms: u32,
    pub session_timeout_seconds: f64,
}

impl Default for BrowserManagerConfig {
    fn default() -> Self {
        Self {
            headless: true,
            no_sandbox: false,
            disable_dev_shm: false,
            disable_web_security: false,
            slow_mo_ms: 0,
            viewport_width: 1280,
            viewport_height: 720,
            user_agent: None,
            ignore_https_errors: false,
            default_timeout_ms: 30_000,
            session_timeout_seconds: 3_600.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
    pub user_agent: Option<String>,
    pub ignore_https_errors: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ManagerStats {
    pub total_commands_executed: u64,
    pub active_sessions: usize,
}

type SessionHandle = Arc<Mutex<BrowserSession>>;

pub struct BrowserManager {
    driver: Arc<dyn PageDriver>,
    browser: Mutex<Option<Box<dyn Browser>>>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
    config: BrowserManagerConfig,
    total_commands_executed: AtomicU64,
    logger: Arc<SessionLogger>,
}

impl BrowserManager {
    pub fn new(driver: Arc<dyn PageDriver>, config: BrowserManagerConfig, logger: Arc<SessionLogger>) -> Self {
        Self {
            driver,
            browser: Mutex::new(None),
            sessions: RwLock::new(HashMap::new()),
            config,
            total_commands_executed: AtomicU64::new(0),
            logger,
        }
    }

    /// Launches the browser process. Safe to call repeatedly; a second call
    /// is a no-op.
    pub async fn initialize(&self) -> Result<(), DriverError> {
        let mut slot = self.browser.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        let mut extra_args = Vec::new();
        if self.config.no_sandbox {
            extra_args.push("--no-sandbox".to_string());
        }
        if self.config.disable_dev_shm {
            extra_args.push("--disable-dev-shm-usage".to_string());
        }
        if self.config.disable_web_security {
            extra_args.push("--disable-web-security".to_string());
        }
        let args = LaunchArgs { headless: self.config.headless, extra_args, slow_mo_ms: self.config.slow_mo_ms };
        let browser = self.driver.launch(args).await?;
        *slot = Some(browser);
        Ok(())
    }

    pub async fn create_session(
        &self,
        now: f64,
        client_id: impl Into<String>,
        overrides: SessionOverrides,
    ) -> Result<String, CoreError> {
        let slot = self.browser.lock().await;
        let browser = slot.as_ref().ok_or_else(|| CoreError::Unknown("browser not initialized".into()))?;

        let options = ContextOptions {
            viewport_width: overrides.viewport_width.unwrap_or(self.config.viewport_width),
            viewport_height: overrides.viewport_height.unwrap_or(self.config.viewport_height),
            user_agent: overrides.user_agent.or_else(|| self.config.user_agent.clone()),
            ignore_https_errors: overrides.ignore_https_errors.unwrap_or(self.config.ignore_https_errors),
            javascript_enabled: true,
            accept_downloads: true,
        };

        let context = browser
            .new_context(options)
            .await
            .map_err(|e| CoreError::Unknown(format!("failed to create context: {e}")))?;
        context.set_default_timeout(self.config.default_timeout_ms).await;
        context.set_default_navigation_timeout(self.config.default_timeout_ms).await;

        let page = context
            .new_page()
            .await
            .map_err(|e| CoreError::Unknown(format!("failed to create page: {e}")))?;
        let mut headers = HashMap::new();
        headers.insert("Accept-Language".to_string(), "en-US,en;q=0.9".to_string());
        let _ = page.set_extra_http_headers(headers).await;

        let session_id = Uuid::new_v4().to_string();
        let session = BrowserSession::new(session_id.clone(), client_id.into(), now, context, page);
        self.sessions.write().await.insert(session_id.clone(), Arc::new(Mutex::new(session)));
        Ok(session_id)
    }

    /// Removes and closes a session, emitting `session_end` under its
    /// client id. Called both from the connection handler on transport
    /// close and from the expiry sweep, so this is the single place that
    /// event is emitted.
    pub async fn close_session(&self, session_id: &str, now: f64) -> bool {
        let handle = self.sessions.write().await.remove(session_id);
        match handle {
            Some(handle) => {
                let mut session = handle.lock().await;
                let client_id = session.client_id.clone();
                let _ = session.close().await;
                drop(session);
                self.logger.log_event(LogEvent::new(now, LogEventType::SessionEnd, client_id, "session closed", true));
                true
            }
            None => false,
        }
    }

    async fn session_handle(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn execute_navigate(
        &self,
        session_id: &str,
        cmd: &NavigateCommand,
        now: f64,
    ) -> Result<NavigateResponse, CoreError> {
        let handle = self.session_handle(session_id).await.ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let mut session = handle.lock().await;
        session.update_activity(now);

        if let Some(referer) = &cmd.referer {
            let mut headers = HashMap::new();
            headers.insert("Referer".to_string(), referer.clone());
            let _ = session.page().set_extra_http_headers(headers).await;
        }

        let start = Instant::now();
        let outcome = session
            .page()
            .goto(&cmd.url, WaitCondition::from(cmd.wait_until), cmd.header.timeout_ms)
            .await
            .map_err(|e| CoreError::from_driver(e, CoreError::NavigationFailed))?;
        let load_time_ms = start.elapsed().as_millis() as u64;

        let title = session.page().title().await.unwrap_or_default();
        let redirected = cmd.url != outcome.final_url;

        self.logger.log_event(
            LogEvent::new(
                now,
                LogEventType::Navigation,
                session.client_id.clone(),
                format!("navigated to {}", outcome.final_url),
                true,
            )
            .with_command_id(cmd.header.id.clone())
            .with_execution_time_ms(load_time_ms)
            .with_data(serde_json::json!({
                "original_url": cmd.url,
                "final_url": outcome.final_url.clone(),
                "status_code": outcome.status,
                "redirected": redirected,
            })),
        );

        Ok(NavigateResponse {
            url: outcome.final_url,
            title,
            status_code: outcome.status,
            redirected,
            load_time_ms,
        })
    }

    pub async fn execute_click(
        &self,
        session_id: &str,
        cmd: &ClickCommand,
        now: f64,
    ) -> Result<ClickResponse, CoreError> {
        let handle = self.session_handle(session_id).await.ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let mut session = handle.lock().await;
        session.update_activity(now);

        let locator = session.page().locator(&cmd.selector);
        let count = locator.count().await.map_err(|e| CoreError::from_driver(e, CoreError::Interaction))?;
        if count == 0 {
            return Err(CoreError::ElementNotFound { selector: cmd.selector.clone() });
        }

        let element_visible = locator.is_visible().await.unwrap_or(false);
        if !element_visible && !cmd.force {
            return Err(CoreError::ElementNotVisible { selector: cmd.selector.clone() });
        }

        let element_text = locator.text_content().await.ok().flatten().unwrap_or_default();
        let element_tag = locator.tag_name().await.unwrap_or_default().to_lowercase();

        let bounding_box = locator.bounding_box().await.ok().flatten();
        let click_position = match (bounding_box, cmd.position) {
            (Some(b), Some(pos)) => ClickPosition { x: b.x + b.width * pos.x, y: b.y + b.height * pos.y },
            (Some(b), None) => ClickPosition { x: b.x + b.width / 2.0, y: b.y + b.height / 2.0 },
            (None, _) => ClickPosition { x: 0.0, y: 0.0 },
        };

        let options = ClickOptions {
            button: cmd.button,
            click_count: cmd.click_count,
            force: cmd.force,
            timeout_ms: cmd.header.timeout_ms,
            position: cmd.position.map(|p| (p.x, p.y)),
        };
        locator.click(options).await.map_err(|e| CoreError::from_driver(e, CoreError::Interaction))?;

        self.logger.log_event(
            LogEvent::new(
                now,
                LogEventType::Interaction,
                session.client_id.clone(),
                format!("click on {}", cmd.selector),
                true,
            )
            .with_command_id(cmd.header.id.clone())
            .with_data(serde_json::json!({ "interaction_type": "click", "selector": cmd.selector })),
        );

        Ok(ClickResponse { element_found: true, element_visible, click_position, element_text, element_tag })
    }

    pub async fn execute_fill(
        &self,
        session_id: &str,
        cmd: &FillCommand,
        now: f64,
    ) -> Result<FillResponse, CoreError> {
        let handle = self.session_handle(session_id).await.ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let mut session = handle.lock().await;
        session.update_activity(now);

        let locator = session.page().locator(&cmd.selector);
        let count = locator.count().await.map_err(|e| CoreError::from_driver(e, CoreError::Interaction))?;
        if count == 0 {
            return Err(CoreError::ElementNotFound { selector: cmd.selector.clone() });
        }

        let element_type = locator.tag_name().await.unwrap_or_default().to_lowercase();
        let is_input = matches!(element_type.as_str(), "input" | "textarea");

        let previous_value = if is_input {
            locator.input_value().await.unwrap_or_default()
        } else {
            String::new()
        };

        if cmd.clear_first {
            locator.clear().await.map_err(|e| CoreError::from_driver(e, CoreError::Interaction))?;
        }

        if cmd.typing_delay_ms > 0 {
            locator
                .type_text(&cmd.text, cmd.typing_delay_ms)
                .await
                .map_err(|e| CoreError::from_driver(e, CoreError::Interaction))?;
        } else {
            locator.fill(&cmd.text).await.map_err(|e| CoreError::from_driver(e, CoreError::Interaction))?;
        }

        if cmd.press_enter {
            locator.press("Enter").await.map_err(|e| CoreError::from_driver(e, CoreError::Interaction))?;
        }

        let current_value = if is_input {
            locator.input_value().await.unwrap_or_else(|_| cmd.text.clone())
        } else {
            cmd.text.clone()
        };

        let validation_passed = !cmd.validate_input || current_value == cmd.text;

        self.logger.log_event(
            LogEvent::new(
                now,
                LogEventType::Interaction,
                session.client_id.clone(),
                format!("fill on {}", cmd.selector),
                validation_passed,
            )
            .with_command_id(cmd.header.id.clone())
            .with_data(serde_json::json!({ "interaction_type": "fill", "selector": cmd.selector })),
        );

        Ok(FillResponse {
            element_found: true,
            element_type,
            text_entered: cmd.text.clone(),
            previous_value,
            current_value,
            validation_passed,
        })
    }

    pub async fn execute_extract(
        &self,
        session_id: &str,
        cmd: &ExtractCommand,
        now: f64,
    ) -> Result<ExtractResponse, CoreError> {
        let handle = self.session_handle(session_id).await.ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let mut session = handle.lock().await;
        session.update_activity(now);

        let locator = session.page().locator(&cmd.selector);
        let count = locator.count().await.map_err(|e| CoreError::from_driver(e, CoreError::Interaction))?;
        if count == 0 {
            return Err(CoreError::ElementNotFound { selector: cmd.selector.clone() });
        }

        let k = if cmd.multiple { count } else { 1 };
        let mut values = Vec::with_capacity(k);
        let mut element_info = Vec::with_capacity(k);

        for index in 0..k {
            let element = locator.nth(index);
            let tag = element.tag_name().await.unwrap_or_default();
            let class = element.get_attribute("class").await.ok().flatten().unwrap_or_default();

            let extracted = self.extract_one(element.as_ref(), cmd).await;
            match extracted {
                Ok(value) => {
                    values.push(serde_json::Value::String(value));
                    element_info.push(ElementInfo { tag, class, index, error: None });
                }
                Err(message) => {
                    values.push(serde_json::Value::String(String::new()));
                    element_info.push(ElementInfo { tag, class, index, error: Some(message) });
                }
            }
        }

        let data = if cmd.multiple {
            serde_json::Value::Array(values)
        } else {
            values.into_iter().next().unwrap_or(serde_json::Value::String(String::new()))
        };

        self.logger.log_event(
            LogEvent::new(
                now,
                LogEventType::Extraction,
                session.client_id.clone(),
                format!("extracted {:?} from {count} elements", cmd.extract_type),
                true,
            )
            .with_command_id(cmd.header.id.clone())
            .with_data(serde_json::json!({
                "selector": cmd.selector,
                "extract_type": format!("{:?}", cmd.extract_type),
                "elements_found": count,
            })),
        );

        Ok(ExtractResponse { elements_found: count, data, element_info })
    }

    async fn extract_one(
        &self,
        element: &dyn crate::driver::Locator,
        cmd: &ExtractCommand,
    ) -> Result<String, String> {
        match cmd.extract_type {
            ExtractType::Text => {
                let text = element.text_content().await.map_err(|e| e.to_string())?.unwrap_or_default();
                Ok(if cmd.trim_whitespace { text.trim().to_string() } else { text })
            }
            ExtractType::Html => element.inner_html().await.map_err(|e| e.to_string()),
            ExtractType::Attribute => {
                let name = cmd.attribute_name.as_deref().ok_or_else(|| "attribute_name is required".to_string())?;
                Ok(element.get_attribute(name).await.map_err(|e| e.to_string())?.unwrap_or_default())
            }
            ExtractType::Property => {
                let name = cmd.property_name.as_deref().ok_or_else(|| "property_name is required".to_string())?;
                let value = element.evaluate(&format!("el => el.{name}")).await.map_err(|e| e.to_string())?;
                Ok(match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
            }
        }
    }

    pub async fn execute_wait(
        &self,
        session_id: &str,
        cmd: &WaitCommand,
        now: f64,
    ) -> Result<WaitResponse, CoreError> {
        let handle = self.session_handle(session_id).await.ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let mut session = handle.lock().await;
        session.update_activity(now);

        let start = Instant::now();
        let timeout_ms = cmd.header.timeout_ms;

        let wait_result: Result<(String, Option<usize>), DriverError> = if let Some(js) = &cmd.custom_js {
            session
                .page()
                .wait_for_function(js, timeout_ms, cmd.poll_interval_ms)
                .await
                .map(|_| ("custom_condition_met".to_string(), None))
        } else if let (Some(text), Some(selector)) = (&cmd.text_content, &cmd.selector) {
            session
                .page()
                .wait_for_function(
                    &format!(
                        "() => document.querySelector({selector:?})?.textContent?.includes({text:?})"
                    ),
                    timeout_ms,
                    cmd.poll_interval_ms,
                )
                .await
                .map(|_| ("text_content_found".to_string(), None))
        } else {
            match cmd.condition {
                WaitCondition::Load | WaitCondition::DomContentLoaded | WaitCondition::NetworkIdle => {
                    let final_state = match cmd.condition {
                        WaitCondition::Load => "page_loaded",
                        WaitCondition::DomContentLoaded => "dom_content_loaded",
                        WaitCondition::NetworkIdle => "network_idle",
                        _ => unreachable!(),
                    };
                    session
                        .page()
                        .wait_for_load_state(cmd.condition, timeout_ms)
                        .await
                        .map(|_| (final_state.to_string(), Some(0)))
                }
                WaitCondition::Visible | WaitCondition::Hidden | WaitCondition::Attached | WaitCondition::Detached => {
                    let selector = cmd.selector.as_deref().ok_or_else(|| {
                        DriverError::other("selector is required for this condition")
                    })?;
                    let element_state = match cmd.condition {
                        WaitCondition::Visible => ElementState::Visible,
                        WaitCondition::Hidden => ElementState::Hidden,
                        WaitCondition::Attached => ElementState::Attached,
                        WaitCondition::Detached => ElementState::Detached,
                        _ => unreachable!(),
                    };
                    let locator = session.page().locator(selector);
                    locator.wait_for(element_state, timeout_ms).await?;
                    let element_count = locator.count().await.unwrap_or(0);
                    Ok((cmd.condition.as_str().to_string(), Some(element_count)))
                }
            }
        };

        let wait_time_ms = start.elapsed().as_millis() as u64;

        match wait_result {
            Ok((final_state, element_count)) => {
                self.logger.log_event(
                    LogEvent::new(
                        now,
                        LogEventType::WaitCondition,
                        session.client_id.clone(),
                        format!("wait condition {} met", cmd.condition.as_str()),
                        true,
                    )
                    .with_command_id(cmd.header.id.clone())
                    .with_execution_time_ms(wait_time_ms)
                    .with_data(serde_json::json!({ "condition": cmd.condition.as_str(), "final_state": final_state })),
                );
                Ok(WaitResponse {
                    condition_met: true,
                    wait_time_ms,
                    final_state,
                    element_count,
                    condition_details: WaitConditionDetails {
                        condition: cmd.condition.as_str().to_string(),
                        selector: cmd.selector.clone(),
                        timeout: timeout_ms,
                    },
                })
            }
            Err(err) if err.is_timeout() => {
                self.logger.log_event(
                    LogEvent::new(
                        now,
                        LogEventType::WaitCondition,
                        session.client_id.clone(),
                        format!("wait condition {} timed out", cmd.condition.as_str()),
                        false,
                    )
                    .with_command_id(cmd.header.id.clone())
                    .with_execution_time_ms(wait_time_ms)
                    .with_data(serde_json::json!({ "condition": cmd.condition.as_str() })),
                );
                Err(CoreError::WaitTimeout { condition: cmd.condition.as_str().to_string(), wait_time_ms })
            }
            Err(err) => Err(CoreError::Unknown(err.to_string())),
        }
    }

    /// Closes any session idle longer than the configured timeout. Returns
    /// the number of sessions closed.
    pub async fn sweep_expired(&self, now: f64) -> usize {
        let expired: Vec<String> = {
            let sessions = self.sessions.read().await;
            let mut expired = Vec::new();
            for (id, handle) in sessions.iter() {
                let session = handle.lock().await;
                if now - session.last_activity > self.config.session_timeout_seconds {
                    expired.push(id.clone());
                }
            }
            expired
        };
        for id in &expired {
            self.close_session(id, now).await;
        }
        expired.len()
    }

    pub fn record_command_executed(&self) {
        self.total_commands_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn stats(&self) -> ManagerStats {
        ManagerStats {
            total_commands_executed: self.total_commands_executed.load(Ordering::Relaxed),
            active_sessions: self.sessions.read().await.len(),
        }
    }

    /// Closes every session (best effort) and releases the browser.
    pub async fn shutdown(&self, now: f64) {
        let ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        for id in ids {
            self.close_session(&id, now).await;
        }
        if let Some(browser) = self.browser.lock().await.take() {
            if let Err(err) = browser.close().await {
                tracing::warn!(error = %err, "error closing browser during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_driver::{MemoryDriver, MemoryElement, MemoryPage};
    use bsrv_protocol::{CommandHeader, MouseButton};

    fn header() -> CommandHeader {
        CommandHeader { id: "a".into(), session_id: "s".into(), timeout_ms: 30_000 }
    }

    fn test_logger() -> (tempfile::TempDir, Arc<SessionLogger>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.log");
        let logger = Arc::new(SessionLogger::open(&path, 1_000_000, 3).unwrap());
        (dir, logger)
    }

    async fn make_manager() -> (BrowserManager, MemoryDriver, tempfile::TempDir, Arc<SessionLogger>) {
        let driver = MemoryDriver::new();
        let (dir, logger) = test_logger();
        let manager = BrowserManager::new(Arc::new(driver.clone()), BrowserManagerConfig::default(), logger.clone());
        manager.initialize().await.unwrap();
        (manager, driver, dir, logger)
    }

    /// Creates a session through the manager the normal way, then hands
    /// back a clone of its `MemoryPage` handle so the test can seed driver
    /// state directly.
    async fn make_seeded_session(manager: &BrowserManager, driver: &MemoryDriver) -> (String, MemoryPage) {
        let id = manager.create_session(0.0, "client-1", SessionOverrides::default()).await.unwrap();
        let page = driver.last_page().expect("a page should have been created");
        (id, page)
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let (manager, driver, _dir, _logger) = make_manager().await;
        manager.initialize().await.unwrap();
        assert_eq!(driver.launch_count(), 1);
    }

    #[tokio::test]
    async fn create_and_close_session_roundtrip() {
        let (manager, _driver, _dir, _logger) = make_manager().await;
        let id = manager.create_session(0.0, "client-1", SessionOverrides::default()).await.unwrap();
        assert!(manager.session_handle(&id).await.is_some());
        assert!(manager.close_session(&id, 1.0).await);
        assert!(!manager.close_session(&id, 1.0).await);
    }

    #[tokio::test]
    async fn close_session_emits_session_end_under_client_id() {
        let (manager, _driver, _dir, logger) = make_manager().await;
        let id = manager.create_session(0.0, "client-1", SessionOverrides::default()).await.unwrap();
        logger.log_event(LogEvent::new(0.0, LogEventType::SessionStart, "client-1", "started", true));
        assert!(logger.session_stats("client-1").is_some());
        manager.close_session(&id, 1.0).await;
        assert!(logger.session_stats("client-1").is_none());
    }

    #[tokio::test]
    async fn navigate_reports_redirect_and_load_time() {
        let (manager, driver, _dir, _logger) = make_manager().await;
        let (session_id, page) = make_seeded_session(&manager, &driver).await;
        page.register_navigation("https://example.test/", "https://example.test/home", "Home");

        let cmd = NavigateCommand {
            header: header(),
            url: "https://example.test/".into(),
            wait_until: bsrv_protocol::WaitUntil::Load,
            referer: None,
        };
        let resp = manager.execute_navigate(&session_id, &cmd, 1.0).await.unwrap();
        assert_eq!(resp.url, "https://example.test/home");
        assert!(resp.redirected);
    }

    #[tokio::test]
    async fn click_on_missing_element_is_not_found() {
        let (manager, _driver, _dir, _logger) = make_manager().await;
        let session_id = manager.create_session(0.0, "client-1", SessionOverrides::default()).await.unwrap();
        let cmd = ClickCommand {
            header: header(),
            selector: "#missing".into(),
            button: MouseButton::Left,
            click_count: 1,
            position: None,
            force: false,
        };
        let err = manager.execute_click(&session_id, &cmd, 1.0).await.unwrap_err();
        assert_eq!(err.error_code(), bsrv_protocol::ErrorCode::ElementNotFound);
    }

    #[tokio::test]
    async fn extract_multiple_collects_all_matches() {
        let (manager, driver, _dir, _logger) = make_manager().await;
        let (session_id, page) = make_seeded_session(&manager, &driver).await;
        page.seed_elements(
            ".item",
            vec![
                MemoryElement { text: "a".into(), visible: true, ..Default::default() },
                MemoryElement { text: "b".into(), visible: true, ..Default::default() },
            ],
        );
        let cmd = ExtractCommand {
            header: header(),
            selector: ".item".into(),
            extract_type: ExtractType::Text,
            attribute_name: None,
            property_name: None,
            multiple: true,
            trim_whitespace: true,
        };
        let resp = manager.execute_extract(&session_id, &cmd, 1.0).await.unwrap();
        assert_eq!(resp.elements_found, 2);
        assert_eq!(resp.data, serde_json::json!(["a", "b"]));
    }

    #[tokio::test]
    async fn sweep_expired_closes_idle_sessions() {
        let (manager, _driver, _dir, _logger) = make_manager().await;
        let id = manager.create_session(0.0, "client-1", SessionOverrides::default()).await.unwrap();
        let closed = manager.sweep_expired(10_000.0).await;
        assert_eq!(closed, 1);
        assert!(manager.session_handle(&id).await.is_none());
    }
}
